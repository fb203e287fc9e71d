//! Manager session.
//!
//! Writes to the backend (replies, status changes, assignment) need a
//! logged-in manager. The identity is persisted through a [`SessionStore`]
//! and loaded once when the [`SessionGuard`] is built.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{DeskwatchError, Result};
use crate::paths::session_path;

/// The logged-in manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSession {
    pub manager_id: String,
    pub manager_name: String,
}

impl ManagerSession {
    /// Build a session, trimming both fields. Empty values are rejected.
    pub fn new(manager_id: impl Into<String>, manager_name: impl Into<String>) -> Result<Self> {
        let manager_id = manager_id.into().trim().to_string();
        let manager_name = manager_name.into().trim().to_string();
        if manager_id.is_empty() {
            return Err(DeskwatchError::InvalidSession(
                "manager id must not be empty".to_string(),
            ));
        }
        if manager_name.is_empty() {
            return Err(DeskwatchError::InvalidSession(
                "manager name must not be empty".to_string(),
            ));
        }
        Ok(ManagerSession {
            manager_id,
            manager_name,
        })
    }
}

/// Persistence for the manager session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<ManagerSession>>;
    fn save(&self, session: &ManagerSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Session persisted as a YAML file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStore { path: path.into() }
    }

    /// Store at `<data root>/session.yaml`.
    pub fn default_location() -> Self {
        Self::new(session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<ManagerSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let stored: ManagerSession = serde_yaml_ng::from_str(&content)?;
        ManagerSession::new(stored.manager_id, stored.manager_name).map(Some)
    }

    fn save(&self, session: &ManagerSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml_ng::to_string(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<ManagerSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: ManagerSession) -> Self {
        MemorySessionStore {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<ManagerSession>> {
        Ok(self.session.lock().clone())
    }

    fn save(&self, session: &ManagerSession) -> Result<()> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock() = None;
        Ok(())
    }
}

/// Gate for write operations.
pub struct SessionGuard {
    store: Box<dyn SessionStore>,
    current: RwLock<Option<ManagerSession>>,
}

impl SessionGuard {
    /// Load the persisted session. A store that cannot be read counts as
    /// logged out.
    pub fn new(store: impl SessionStore + 'static) -> Self {
        let current = match store.load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Failed to load manager session, starting logged out: {e}");
                None
            }
        };
        SessionGuard {
            store: Box::new(store),
            current: RwLock::new(current),
        }
    }

    /// Log in and persist the session. Nothing changes if saving fails.
    pub fn login(
        &self,
        manager_id: impl Into<String>,
        manager_name: impl Into<String>,
    ) -> Result<ManagerSession> {
        let session = ManagerSession::new(manager_id, manager_name)?;
        self.store.save(&session)?;
        *self.current.write() = Some(session.clone());
        tracing::info!("Manager {} logged in", session.manager_id);
        Ok(session)
    }

    /// Log out. The in-memory session is dropped even if clearing the
    /// persisted copy fails; that failure is returned.
    pub fn logout(&self) -> Result<()> {
        let previous = self.current.write().take();
        if let Some(previous) = previous {
            tracing::info!("Manager {} logged out", previous.manager_id);
        }
        self.store.clear()
    }

    pub fn current(&self) -> Option<ManagerSession> {
        self.current.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.read().is_some()
    }

    /// The current session, or [`DeskwatchError::NotLoggedIn`].
    pub fn require(&self) -> Result<ManagerSession> {
        self.current().ok_or(DeskwatchError::NotLoggedIn)
    }
}

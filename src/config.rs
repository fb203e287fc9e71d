//! Engine configuration.
//!
//! Configuration is stored in `<data root>/config.yaml` and includes:
//! - Backend location and request timeout
//! - Poll intervals for the ticket list and the focused thread
//! - The statuses a manager is allowed to set

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DeskwatchError, Result};
use crate::paths::config_path;
use crate::types::TicketStatus;

/// Environment variable that overrides `backend_url`.
pub const BACKEND_URL_ENV: &str = "DESKWATCH_BACKEND_URL";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the helpdesk backend (default: http://localhost:3001)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Path prefix of the versioned API (default: /api/v1)
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// HTTP request timeout in seconds (default: 10)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Poll cadence
    #[serde(default, skip_serializing_if = "PollConfig::is_default")]
    pub poll: PollConfig,

    /// Statuses a manager may set by hand
    #[serde(default = "default_manager_statuses")]
    pub manager_statuses: Vec<TicketStatus>,

    /// Characters of the first message shown in list rows (default: 60)
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

fn default_backend_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_manager_statuses() -> Vec<TicketStatus> {
    vec![
        TicketStatus::New,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ]
}

fn default_preview_length() -> usize {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_prefix: default_api_prefix(),
            request_timeout: default_request_timeout(),
            poll: PollConfig::default(),
            manager_statuses: default_manager_statuses(),
            preview_length: default_preview_length(),
        }
    }
}

/// Poll intervals in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Ticket list refresh interval (default: 5000)
    #[serde(default = "default_tickets_interval_ms")]
    pub tickets_interval_ms: u64,

    /// Focused thread refresh interval (default: 3000)
    #[serde(default = "default_thread_interval_ms")]
    pub thread_interval_ms: u64,
}

fn default_tickets_interval_ms() -> u64 {
    5000
}

fn default_thread_interval_ms() -> u64 {
    3000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tickets_interval_ms: default_tickets_interval_ms(),
            thread_interval_ms: default_thread_interval_ms(),
        }
    }
}

impl PollConfig {
    /// Check if this config is the default (for serialization skip)
    pub fn is_default(&self) -> bool {
        *self == PollConfig::default()
    }

    pub fn tickets_interval(&self) -> Duration {
        Duration::from_millis(self.tickets_interval_ms)
    }

    pub fn thread_interval(&self) -> Duration {
        Duration::from_millis(self.thread_interval_ms)
    }
}

impl Config {
    /// Load configuration from the default path, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration from `path`, or return defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DeskwatchError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Backend URL from the environment or the config file
    pub fn resolved_backend_url(&self) -> String {
        if let Ok(url) = env::var(BACKEND_URL_ENV)
            && !url.is_empty()
        {
            return url;
        }
        self.backend_url.clone()
    }

    /// Base URL for API calls: backend URL joined with the API prefix,
    /// without a trailing slash.
    pub fn api_base(&self) -> Result<String> {
        let root = self.backend_root()?;
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            Ok(root)
        } else {
            Ok(format!("{root}/{prefix}"))
        }
    }

    /// Backend URL without a trailing slash, validated
    pub fn backend_root(&self) -> Result<String> {
        let raw = self.resolved_backend_url();
        let url = Url::parse(&raw)
            .map_err(|e| DeskwatchError::Config(format!("invalid backend_url '{raw}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DeskwatchError::Config(format!(
                "backend_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Reject values that would stall or busy-loop the engine
    pub fn validate(&self) -> Result<()> {
        if self.poll.tickets_interval_ms == 0 || self.poll.thread_interval_ms == 0 {
            return Err(DeskwatchError::Config(
                "poll intervals must be greater than zero".to_string(),
            ));
        }
        if self.manager_statuses.is_empty() {
            return Err(DeskwatchError::Config(
                "manager_statuses must list at least one status".to_string(),
            ));
        }
        if self.request_timeout == 0 {
            return Err(DeskwatchError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        self.backend_root()?;
        Ok(())
    }
}

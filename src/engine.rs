//! Engine facade wiring store, polling, session and writes together.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::backend::{Backend, HttpBackend};
use crate::config::Config;
use crate::error::Result;
use crate::filter::{StatusCounts, TicketFilter};
use crate::messaging::Messenger;
use crate::metrics::ThreadMetrics;
use crate::session::{FileSessionStore, ManagerSession, SessionGuard, SessionStore};
use crate::status::StatusTransitionManager;
use crate::store::{StoreEvent, StoreSnapshot, SyncHealth, TicketStore};
use crate::sync::{PollScheduler, Reconciler};
use crate::types::{Message, Ticket, TicketId, TicketStatus};

/// Client-side sync engine for the monitoring console.
///
/// Build it, call [`start`](Self::start) inside a tokio runtime, read
/// snapshots and subscribe to change events. Dropping the engine (or
/// calling [`shutdown`](Self::shutdown)) stops the poll loops.
pub struct SyncEngine<B: Backend> {
    store: Arc<TicketStore>,
    reconciler: Arc<Reconciler<B>>,
    scheduler: Arc<PollScheduler<B>>,
    session: Arc<SessionGuard>,
    status: StatusTransitionManager<B>,
    messenger: Messenger<B>,
    preview_length: usize,
}

impl SyncEngine<HttpBackend> {
    /// Engine for the configured HTTP backend, with the session persisted
    /// under the data root.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let backend = HttpBackend::from_config(config)?;
        Ok(Self::new(
            backend,
            config,
            FileSessionStore::default_location(),
        ))
    }
}

impl<B: Backend> SyncEngine<B> {
    pub fn new(backend: B, config: &Config, sessions: impl SessionStore + 'static) -> Self {
        Self::with_backend(Arc::new(backend), config, sessions)
    }

    pub fn with_backend(
        backend: Arc<B>,
        config: &Config,
        sessions: impl SessionStore + 'static,
    ) -> Self {
        let store = Arc::new(TicketStore::new());
        let reconciler = Arc::new(Reconciler::new(backend, store.clone()));
        let session = Arc::new(SessionGuard::new(sessions));
        let scheduler = Arc::new(PollScheduler::new(reconciler.clone(), config.poll.clone()));

        SyncEngine {
            status: StatusTransitionManager::new(
                scheduler.clone(),
                session.clone(),
                config.manager_statuses.clone(),
            ),
            messenger: Messenger::new(scheduler.clone(), session.clone()),
            scheduler,
            store,
            reconciler,
            session,
            preview_length: config.preview_length,
        }
    }

    /// Start ticket-list polling.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop all polling. Reads keep working on the last snapshot.
    pub fn shutdown(&self) {
        self.scheduler.dispose();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn is_thread_polling(&self) -> bool {
        self.scheduler.is_thread_polling()
    }

    /// Focus a ticket and poll its thread.
    pub fn select(&self, ticket_id: impl Into<TicketId>) {
        self.scheduler.select(ticket_id.into());
    }

    pub fn clear_selection(&self) {
        self.scheduler.clear_selection();
    }

    /// The underlying store. Mutations stay inside the crate; selection goes
    /// through [`select`](Self::select).
    pub fn store(&self) -> &Arc<TicketStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.store.snapshot()
    }

    pub fn tickets(&self) -> Arc<Vec<Ticket>> {
        self.store.current_tickets()
    }

    pub fn thread(&self) -> Arc<Vec<Message>> {
        self.store.current_thread()
    }

    pub fn focused_ticket(&self) -> Option<Ticket> {
        self.store.focused_ticket()
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_loaded()
    }

    pub fn health(&self) -> SyncHealth {
        self.store.health()
    }

    /// Ask the backend's health endpoint whether it is up.
    pub async fn check_backend(&self) -> Result<()> {
        self.reconciler.backend().health().await
    }

    /// Metrics of the focused thread; all zero when nothing is focused.
    pub fn metrics(&self) -> ThreadMetrics {
        let snapshot = self.store.snapshot();
        match snapshot.focused_ticket() {
            Some(ticket) => ThreadMetrics::compute(&snapshot.thread, ticket.status),
            None => ThreadMetrics::default(),
        }
    }

    /// Tickets passing `filter`, in list order.
    pub fn filtered(&self, filter: TicketFilter) -> Vec<Ticket> {
        filter
            .apply(&self.store.current_tickets())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::from_tickets(&self.store.current_tickets())
    }

    /// List-row preview of a ticket's first message.
    pub fn preview(&self, ticket: &Ticket) -> String {
        ticket.preview(self.preview_length)
    }

    pub fn login(
        &self,
        manager_id: impl Into<String>,
        manager_name: impl Into<String>,
    ) -> Result<ManagerSession> {
        self.session.login(manager_id, manager_name)
    }

    pub fn logout(&self) -> Result<()> {
        self.session.logout()
    }

    pub fn session(&self) -> Option<ManagerSession> {
        self.session.current()
    }

    pub fn allowed_statuses(&self) -> &[TicketStatus] {
        self.status.allowed_targets()
    }

    pub async fn change_status(
        &self,
        ticket_id: &TicketId,
        status: TicketStatus,
    ) -> Result<TicketStatus> {
        self.status.change_status(ticket_id, status).await
    }

    /// Target status of a write still in flight for the ticket.
    pub fn pending_status(&self, ticket_id: &TicketId) -> Option<TicketStatus> {
        self.status.pending_target(ticket_id)
    }

    pub fn pending_writes(&self) -> Vec<(TicketId, TicketStatus)> {
        self.status.pending_writes()
    }

    pub async fn send_message(&self, ticket_id: &TicketId, content: &str) -> Result<()> {
        self.messenger.send_message(ticket_id, content).await
    }

    pub async fn take_ticket(&self, ticket_id: &TicketId) -> Result<TicketStatus> {
        self.messenger.take_ticket(ticket_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::DeskwatchError;
    use crate::session::MemorySessionStore;
    use crate::testing::{ScriptedBackend, message, ticket};
    use crate::types::SenderType;
    use tokio::sync::broadcast::error::TryRecvError;

    fn engine() -> (Arc<ScriptedBackend>, SyncEngine<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new());
        let engine = SyncEngine::with_backend(
            backend.clone(),
            &Config::default(),
            MemorySessionStore::new(),
        );
        (backend, engine)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn drain(rx: &mut broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_lifecycle_end_to_end() {
        let (backend, engine) = engine();
        let id = TicketId::from("T1");
        backend.set_tickets(vec![ticket("T1", TicketStatus::New)]);
        backend.set_thread(
            "T1",
            vec![
                message("m1", SenderType::Customer, 1),
                message("m2", SenderType::Ai, 2),
            ],
        );

        engine.start();
        settle().await;
        assert!(engine.is_loaded());
        assert_eq!(engine.tickets()[0].status, TicketStatus::New);

        backend.set_tickets(vec![ticket("T1", TicketStatus::AiProcessing)]);
        tokio::time::sleep(Duration::from_millis(5001)).await;
        assert_eq!(engine.tickets()[0].status, TicketStatus::AiProcessing);

        engine.select("T1");
        settle().await;
        assert_eq!(engine.thread().len(), 2);
        assert_eq!(engine.metrics().iterations, 1);

        engine.login("42", "Olga").unwrap();
        let confirmed = engine
            .change_status(&id, TicketStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(confirmed, TicketStatus::Resolved);
        assert_eq!(
            engine.focused_ticket().map(|t| t.status),
            Some(TicketStatus::Resolved)
        );

        let mut events = engine.subscribe();
        let before = engine.snapshot();
        tokio::time::sleep(Duration::from_millis(5001)).await;
        assert!(drain(&mut events).is_empty());
        assert!(Arc::ptr_eq(&before, &engine.snapshot()));
        assert_eq!(engine.tickets()[0].status, TicketStatus::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_ticket_clears_selection_and_thread_polling() {
        let (backend, engine) = engine();
        backend.set_tickets(vec![
            ticket("1", TicketStatus::New),
            ticket("2", TicketStatus::Escalated),
        ]);
        engine.start();
        settle().await;

        engine.select("2");
        settle().await;
        assert!(engine.is_thread_polling());

        backend.set_tickets(vec![ticket("1", TicketStatus::New)]);
        tokio::time::sleep(Duration::from_millis(5001)).await;

        assert_eq!(engine.focused_ticket(), None);
        assert!(engine.thread().is_empty());
        assert!(!engine.is_thread_polling());
        assert_eq!(engine.metrics(), ThreadMetrics::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_change_refresh_stops_thread_polling_of_removed_ticket() {
        let (backend, engine) = engine();
        backend.set_tickets(vec![
            ticket("1", TicketStatus::InProgress),
            ticket("2", TicketStatus::Escalated),
        ]);
        engine.start();
        settle().await;
        engine.select("2");
        settle().await;
        assert!(engine.is_thread_polling());

        backend.set_tickets(vec![ticket("1", TicketStatus::InProgress)]);
        engine.login("42", "Olga").unwrap();
        engine
            .change_status(&TicketId::from("1"), TicketStatus::Resolved)
            .await
            .unwrap();

        assert_eq!(engine.focused_ticket(), None);
        assert!(!engine.is_thread_polling());
        let calls = backend.thread_calls_for("2");
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(backend.thread_calls_for("2"), calls);
    }

    #[tokio::test]
    async fn test_writes_need_a_session() {
        let (backend, engine) = engine();
        backend.set_tickets(vec![ticket("1", TicketStatus::Escalated)]);
        engine.reconciler.refresh_tickets().await;
        let id = TicketId::from("1");

        assert!(matches!(
            engine.change_status(&id, TicketStatus::Closed).await,
            Err(DeskwatchError::NotLoggedIn)
        ));
        assert!(matches!(
            engine.send_message(&id, "hello").await,
            Err(DeskwatchError::NotLoggedIn)
        ));
        assert!(matches!(
            engine.take_ticket(&id).await,
            Err(DeskwatchError::NotLoggedIn)
        ));
        assert!(backend.posted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_views_over_current_list() {
        let (backend, engine) = engine();
        let mut first = ticket("1", TicketStatus::Escalated);
        first.first_message_preview = "x".repeat(80);
        backend.set_tickets(vec![
            first,
            ticket("2", TicketStatus::AiProcessing),
            ticket("3", TicketStatus::Escalated),
        ]);
        engine.reconciler.refresh_tickets().await;

        assert_eq!(engine.filtered(TicketFilter::escalated()).len(), 2);
        assert_eq!(engine.status_counts().ai_processing, 1);
        let preview = engine.preview(&engine.tickets()[0]);
        assert_eq!(preview.chars().count(), 60);
    }

    #[tokio::test]
    async fn test_shutdown_stops_polling() {
        let (_backend, engine) = engine();
        engine.start();
        engine.select("1");
        assert!(engine.is_running());
        engine.shutdown();
        assert!(!engine.is_running());
        assert!(!engine.is_thread_polling());
    }
}

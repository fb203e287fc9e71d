use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use super::reconciler::{ReconcileOutcome, Reconciler};
use crate::backend::Backend;
use crate::config::PollConfig;
use crate::store::TicketStore;
use crate::types::TicketId;

/// The running thread loop and the ticket it polls.
struct ThreadLoop {
    ticket_id: TicketId,
    handle: JoinHandle<()>,
}

type ThreadSlot = Arc<Mutex<Option<ThreadLoop>>>;

/// Drives the two poll loops.
///
/// The list loop runs from [`start`](Self::start) until
/// [`dispose`](Self::dispose). The thread loop runs only while a ticket is
/// selected and restarts with an immediate fetch on every selection change.
/// Each tick spawns its fetch as a separate task; a slow fetch never delays
/// the next tick.
pub struct PollScheduler<B: Backend> {
    reconciler: Arc<Reconciler<B>>,
    intervals: PollConfig,
    list_loop: Mutex<Option<JoinHandle<()>>>,
    thread_loop: ThreadSlot,
}

impl<B: Backend> PollScheduler<B> {
    pub fn new(reconciler: Arc<Reconciler<B>>, intervals: PollConfig) -> Self {
        PollScheduler {
            reconciler,
            intervals,
            list_loop: Mutex::new(None),
            thread_loop: Arc::new(Mutex::new(None)),
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler<B>> {
        &self.reconciler
    }

    fn store(&self) -> &Arc<TicketStore> {
        self.reconciler.store()
    }

    /// Refresh the ticket list outside the timer, as after a write. Like a
    /// timer tick, a refresh that drops the focused ticket stops its thread
    /// loop before returning.
    pub async fn refresh_tickets(&self) -> ReconcileOutcome {
        refresh_list(&self.reconciler, &self.thread_loop).await
    }

    /// Start the ticket-list loop. The first fetch is issued immediately.
    /// Calling this while already running does nothing.
    pub fn start(&self) {
        let mut list_loop = self.list_loop.lock();
        if list_loop.is_some() {
            return;
        }

        let reconciler = self.reconciler.clone();
        let thread_loop = self.thread_loop.clone();
        let period = self.intervals.tickets_interval();
        *list_loop = Some(tokio::spawn(async move {
            let mut ticker = poll_interval(period);
            loop {
                ticker.tick().await;
                let reconciler = reconciler.clone();
                let thread_loop = thread_loop.clone();
                tokio::spawn(async move {
                    refresh_list(&reconciler, &thread_loop).await;
                });
            }
        }));
        tracing::info!("Started ticket polling every {:?}", period);
    }

    /// Select a ticket: focus it and (re)start the thread loop for it.
    pub fn select(&self, ticket_id: TicketId) {
        let mut slot = self.thread_loop.lock();
        if let Some(current) = slot.as_ref()
            && current.ticket_id == ticket_id
        {
            return;
        }
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        self.store().set_focus(Some(ticket_id.clone()));
        let handle = spawn_thread_loop(
            self.reconciler.clone(),
            ticket_id.clone(),
            self.intervals.thread_interval(),
        );
        tracing::debug!("Polling thread of ticket {ticket_id}");
        *slot = Some(ThreadLoop { ticket_id, handle });
    }

    /// Clear the selection and stop the thread loop.
    pub fn clear_selection(&self) {
        let mut slot = self.thread_loop.lock();
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }
        self.store().set_focus(None);
    }

    /// Stop both loops. Fetches already in flight still complete and are
    /// reconciled as usual.
    pub fn dispose(&self) {
        let list = self.list_loop.lock().take();
        let thread = self.thread_loop.lock().take();
        if let Some(handle) = list {
            handle.abort();
            tracing::info!("Stopped ticket polling");
        }
        if let Some(thread) = thread {
            thread.handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.list_loop.lock().is_some()
    }

    pub fn is_thread_polling(&self) -> bool {
        self.thread_loop.lock().is_some()
    }

    /// Ticket whose thread is being polled, if any.
    pub fn polled_ticket(&self) -> Option<TicketId> {
        self.thread_loop.lock().as_ref().map(|l| l.ticket_id.clone())
    }
}

impl<B: Backend> Drop for PollScheduler<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn poll_interval(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn spawn_thread_loop<B: Backend>(
    reconciler: Arc<Reconciler<B>>,
    ticket_id: TicketId,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = poll_interval(period);
        loop {
            ticker.tick().await;
            let reconciler = reconciler.clone();
            let ticket_id = ticket_id.clone();
            tokio::spawn(async move {
                reconciler.refresh_thread(&ticket_id).await;
            });
        }
    })
}

async fn refresh_list<B: Backend>(
    reconciler: &Reconciler<B>,
    slot: &ThreadSlot,
) -> ReconcileOutcome {
    let outcome = reconciler.refresh_tickets().await;
    stop_orphaned_thread_loop(slot, reconciler.store());
    outcome
}

/// Stop the thread loop if the store no longer focuses its ticket, which
/// happens when a list refresh drops the focused ticket.
fn stop_orphaned_thread_loop(slot: &ThreadSlot, store: &TicketStore) {
    let mut slot = slot.lock();
    let orphaned = slot
        .as_ref()
        .is_some_and(|l| store.focus().as_ref() != Some(&l.ticket_id));
    if orphaned && let Some(stale) = slot.take() {
        stale.handle.abort();
        tracing::debug!("Stopped polling thread of ticket {}", stale.ticket_id);
    }
}

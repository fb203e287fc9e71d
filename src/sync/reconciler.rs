use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use jiff::Timestamp;
use parking_lot::Mutex;

use crate::backend::Backend;
use crate::status::lifecycle;
use crate::store::{ThreadApply, TicketStore};
use crate::types::{Ticket, TicketId, TicketStatus};

/// What happened to one fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The store changed
    Applied,
    /// The result matched the store
    Unchanged,
    /// The result was superseded and discarded
    Stale,
    /// The fetch failed; the store is untouched
    Failed,
}

/// Sequence numbers of the newest results applied so far.
#[derive(Debug, Default)]
struct Watermarks {
    list: u64,
    thread: u64,
}

/// Merges backend snapshots into the store.
///
/// Every fetch takes a sequence number from one counter when it is issued.
/// A response older than the newest applied response of its kind is
/// discarded, so completion order never matters.
pub struct Reconciler<B> {
    backend: Arc<B>,
    store: Arc<TicketStore>,
    issued: AtomicU64,
    applied: Mutex<Watermarks>,
}

impl<B: Backend> Reconciler<B> {
    pub fn new(backend: Arc<B>, store: Arc<TicketStore>) -> Self {
        Reconciler {
            backend,
            store,
            issued: AtomicU64::new(0),
            applied: Mutex::new(Watermarks::default()),
        }
    }

    pub fn store(&self) -> &Arc<TicketStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn next_seq(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Fetch the ticket list and replace the store's list with it.
    pub async fn refresh_tickets(&self) -> ReconcileOutcome {
        let seq = self.next_seq();
        match self.backend.fetch_tickets().await {
            Ok(tickets) => self.apply_tickets(seq, tickets),
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!("Failed to refresh ticket list, retrying next tick: {e}");
                } else {
                    tracing::error!("Failed to refresh ticket list: {e}");
                }
                self.store.record_sync_failure();
                self.store.mark_loaded();
                ReconcileOutcome::Failed
            }
        }
    }

    fn apply_tickets(&self, seq: u64, tickets: Vec<Ticket>) -> ReconcileOutcome {
        let mut applied = self.applied.lock();
        if seq <= applied.list {
            tracing::debug!(
                "Discarding ticket list #{seq}, #{} already applied",
                applied.list
            );
            return ReconcileOutcome::Stale;
        }
        applied.list = seq;

        log_unexpected_transitions(&self.store.current_tickets(), &tickets);
        let outcome = self.store.apply_ticket_snapshot(tickets);
        self.store.record_sync_success(Timestamp::now());

        if outcome.focus_cleared {
            tracing::debug!("Focused ticket left the list, focus cleared");
        }
        if outcome.changed {
            ReconcileOutcome::Applied
        } else {
            ReconcileOutcome::Unchanged
        }
    }

    /// Fetch the thread of `ticket_id` and install it if that ticket is
    /// still focused when the response arrives.
    pub async fn refresh_thread(&self, ticket_id: &TicketId) -> ReconcileOutcome {
        let seq = self.next_seq();
        match self.backend.fetch_thread(ticket_id).await {
            Ok(messages) => {
                let mut applied = self.applied.lock();
                if seq <= applied.thread {
                    tracing::debug!(
                        "Discarding thread #{seq} for ticket {ticket_id}: superseded"
                    );
                    return ReconcileOutcome::Stale;
                }
                match self.store.apply_thread_snapshot(ticket_id, messages) {
                    ThreadApply::Applied => {
                        applied.thread = seq;
                        ReconcileOutcome::Applied
                    }
                    ThreadApply::Unchanged => {
                        applied.thread = seq;
                        ReconcileOutcome::Unchanged
                    }
                    ThreadApply::NotFocused => {
                        tracing::debug!(
                            "Discarding thread for ticket {ticket_id}: no longer focused"
                        );
                        ReconcileOutcome::Stale
                    }
                    ThreadApply::Regressed => {
                        tracing::debug!(
                            "Discarding thread for ticket {ticket_id}: older than held thread"
                        );
                        ReconcileOutcome::Stale
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to refresh thread for ticket {ticket_id}: {e}");
                ReconcileOutcome::Failed
            }
        }
    }

    /// Apply a status the backend has confirmed.
    ///
    /// Every list fetch issued before this call becomes stale, so a poll that
    /// left before the write cannot put the old status back.
    pub fn apply_confirmed_status(&self, ticket_id: &TicketId, status: TicketStatus) -> bool {
        let mut applied = self.applied.lock();
        applied.list = applied.list.max(self.issued.load(Ordering::SeqCst));
        self.store.apply_status(ticket_id, status)
    }
}

fn log_unexpected_transitions(current: &[Ticket], incoming: &[Ticket]) {
    if current.is_empty() {
        return;
    }
    let previous: HashMap<&TicketId, TicketStatus> =
        current.iter().map(|t| (&t.id, t.status)).collect();
    for ticket in incoming {
        let Some(&from) = previous.get(&ticket.id) else {
            continue;
        };
        if from == ticket.status || lifecycle::is_edge(from, ticket.status) {
            continue;
        }
        if from.is_terminal() {
            tracing::info!("Closed ticket {} reopened as {}", ticket.id, ticket.status);
        } else {
            tracing::debug!(
                "Ticket {} moved {} -> {} outside the lifecycle",
                ticket.id,
                from,
                ticket.status
            );
        }
    }
}

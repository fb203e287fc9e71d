//! In-memory ticket store.
//!
//! Holds the ticket list, the focus selection and the focused ticket's
//! thread as one immutable [`StoreSnapshot`] behind an `Arc`. Every mutation
//! builds a complete new snapshot and swaps it in under a short write lock,
//! so readers only ever see a whole prior or a whole new state. A mutation
//! that yields an identical snapshot keeps the old `Arc` and publishes no
//! event.

use std::collections::HashSet;
use std::sync::Arc;

use jiff::Timestamp;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::types::{Message, Ticket, TicketId, TicketStatus};

mod health;

pub use health::SyncHealth;

/// Capacity of the change-notification channel. Slow subscribers that fall
/// further behind than this see `RecvError::Lagged` and should re-read the
/// snapshot.
const EVENT_CAPACITY: usize = 64;

/// Notification sent when the store changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The ticket list (or a ticket's fields) changed.
    TicketsChanged,
    /// The focused thread was replaced or emptied.
    ThreadChanged,
    /// The focus selection changed, including being cleared.
    FocusChanged,
}

/// Complete point-in-time view of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub tickets: Arc<Vec<Ticket>>,
    pub focus: Option<TicketId>,
    /// Thread of the focused ticket; empty when nothing is focused
    pub thread: Arc<Vec<Message>>,
    /// Set once the first ticket-list fetch has completed, even if it failed
    pub loaded: bool,
}

impl StoreSnapshot {
    pub fn ticket(&self, id: &TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|t| &t.id == id)
    }

    pub fn focused_ticket(&self) -> Option<&Ticket> {
        self.focus.as_ref().and_then(|id| self.ticket(id))
    }
}

/// Result of replacing the ticket list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListApply {
    pub changed: bool,
    /// The focused ticket was missing from the new list, so focus was cleared
    pub focus_cleared: bool,
}

/// Result of replacing the focused thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadApply {
    Applied,
    Unchanged,
    /// The thread belongs to a ticket that is no longer focused
    NotFocused,
    /// The snapshot is a strict prefix of the held thread (an older response)
    Regressed,
}

/// Store for the console's ticket view with copy-on-write snapshots.
///
/// Read-only outside the crate; focus changes go through the poll scheduler
/// so the thread loop always follows the focus.
///
/// ```compile_fail
/// let store = deskwatch::TicketStore::new();
/// store.set_focus(Some(deskwatch::TicketId::from("7")));
/// ```
pub struct TicketStore {
    state: RwLock<Arc<StoreSnapshot>>,
    health: RwLock<SyncHealth>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for TicketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketStore {
    /// Create an empty store with no tickets and no focus.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        TicketStore {
            state: RwLock::new(Arc::new(StoreSnapshot::default())),
            health: RwLock::new(SyncHealth::default()),
            events,
        }
    }

    /// Subscribe to store change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.state.read().clone()
    }

    /// Ordered snapshot of all known tickets.
    pub fn current_tickets(&self) -> Arc<Vec<Ticket>> {
        self.state.read().tickets.clone()
    }

    /// Ordered snapshot of the focused thread, empty if nothing is focused.
    pub fn current_thread(&self) -> Arc<Vec<Message>> {
        self.state.read().thread.clone()
    }

    pub fn focus(&self) -> Option<TicketId> {
        self.state.read().focus.clone()
    }

    pub fn focused_ticket(&self) -> Option<Ticket> {
        self.state.read().focused_ticket().cloned()
    }

    pub fn ticket(&self, id: &TicketId) -> Option<Ticket> {
        self.state.read().ticket(id).cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    pub fn health(&self) -> SyncHealth {
        *self.health.read()
    }

    /// Change the focus selection. A different focus always starts with an
    /// empty thread. Returns true if the focus changed.
    pub(crate) fn set_focus(&self, focus: Option<TicketId>) -> bool {
        let thread_was_empty;
        {
            let mut guard = self.state.write();
            if guard.focus == focus {
                return false;
            }
            thread_was_empty = guard.thread.is_empty();
            let mut next = StoreSnapshot::clone(&guard);
            next.focus = focus;
            next.thread = Arc::new(Vec::new());
            *guard = Arc::new(next);
        }

        self.publish(StoreEvent::FocusChanged);
        if !thread_was_empty {
            self.publish(StoreEvent::ThreadChanged);
        }
        true
    }

    /// Replace the whole ticket list.
    ///
    /// Tickets are keyed by id: a repeated id keeps its first occurrence. The
    /// focus survives if its ticket is still listed and is cleared (with the
    /// thread) otherwise.
    pub(crate) fn apply_ticket_snapshot(&self, tickets: Vec<Ticket>) -> ListApply {
        let tickets = dedupe_tickets(tickets);

        let outcome;
        {
            let mut guard = self.state.write();
            let list_changed = *guard.tickets != tickets;
            let focus_cleared = guard
                .focus
                .as_ref()
                .is_some_and(|id| !tickets.iter().any(|t| &t.id == id));

            if !list_changed && !focus_cleared && guard.loaded {
                return ListApply {
                    changed: false,
                    focus_cleared: false,
                };
            }

            let mut next = StoreSnapshot::clone(&guard);
            if list_changed {
                next.tickets = Arc::new(tickets);
            }
            next.loaded = true;
            let thread_was_empty = next.thread.is_empty();
            if focus_cleared {
                next.focus = None;
                next.thread = Arc::new(Vec::new());
            }
            *guard = Arc::new(next);

            outcome = (
                ListApply {
                    changed: true,
                    focus_cleared,
                },
                thread_was_empty,
            );
        }

        let (apply, thread_was_empty) = outcome;
        self.publish(StoreEvent::TicketsChanged);
        if apply.focus_cleared {
            self.publish(StoreEvent::FocusChanged);
            if !thread_was_empty {
                self.publish(StoreEvent::ThreadChanged);
            }
        }
        apply
    }

    /// Mark the first list load as finished without data (the fetch failed).
    pub(crate) fn mark_loaded(&self) {
        {
            let mut guard = self.state.write();
            if guard.loaded {
                return;
            }
            let mut next = StoreSnapshot::clone(&guard);
            next.loaded = true;
            *guard = Arc::new(next);
        }
        self.publish(StoreEvent::TicketsChanged);
    }

    /// Replace the thread of `ticket_id` if it is still the focused ticket.
    ///
    /// Messages are ordered by `created_at` with ties kept in arrival order;
    /// a repeated message key keeps its first occurrence.
    pub(crate) fn apply_thread_snapshot(
        &self,
        ticket_id: &TicketId,
        messages: Vec<Message>,
    ) -> ThreadApply {
        let messages = order_thread(messages);

        {
            let mut guard = self.state.write();
            if guard.focus.as_ref() != Some(ticket_id) {
                return ThreadApply::NotFocused;
            }
            if *guard.thread == messages {
                return ThreadApply::Unchanged;
            }
            if messages.len() < guard.thread.len() && guard.thread.starts_with(&messages) {
                return ThreadApply::Regressed;
            }

            let mut next = StoreSnapshot::clone(&guard);
            next.thread = Arc::new(messages);
            *guard = Arc::new(next);
        }

        self.publish(StoreEvent::ThreadChanged);
        ThreadApply::Applied
    }

    /// Set the status of one ticket. Returns true if a ticket changed.
    pub(crate) fn apply_status(&self, ticket_id: &TicketId, status: TicketStatus) -> bool {
        {
            let mut guard = self.state.write();
            let Some(index) = guard.tickets.iter().position(|t| &t.id == ticket_id) else {
                return false;
            };
            if guard.tickets[index].status == status {
                return false;
            }

            let mut tickets = Vec::clone(&guard.tickets);
            tickets[index].status = status;
            let mut next = StoreSnapshot::clone(&guard);
            next.tickets = Arc::new(tickets);
            *guard = Arc::new(next);
        }

        self.publish(StoreEvent::TicketsChanged);
        true
    }

    /// Record a successful ticket-list sync.
    pub(crate) fn record_sync_success(&self, at: Timestamp) {
        self.health.write().record_success(at);
    }

    /// Record a failed ticket-list sync.
    pub(crate) fn record_sync_failure(&self) {
        self.health.write().record_failure();
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn dedupe_tickets(tickets: Vec<Ticket>) -> Vec<Ticket> {
    let mut seen = HashSet::with_capacity(tickets.len());
    tickets
        .into_iter()
        .filter(|ticket| {
            let fresh = seen.insert(ticket.id.clone());
            if !fresh {
                tracing::warn!("Duplicate ticket id '{}' in ticket list, keeping first", ticket.id);
            }
            fresh
        })
        .collect()
}

fn order_thread(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::with_capacity(messages.len());
    let mut ordered: Vec<Message> = messages
        .into_iter()
        .enumerate()
        .filter(|(index, message)| seen.insert(message.key(*index)))
        .map(|(_, message)| message)
        .collect();
    // Stable: equal timestamps keep arrival order
    ordered.sort_by_key(|m| m.created_at);
    ordered
}

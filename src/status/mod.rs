//! Manager-initiated status changes.
//!
//! A change is validated locally, written through to the backend and only
//! applied to the store once the backend confirms it. There is no optimistic
//! apply: a failed write leaves the store exactly as it was.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::backend::Backend;
use crate::error::{DeskwatchError, Result};
use crate::session::SessionGuard;
use crate::sync::PollScheduler;
use crate::types::{TicketId, TicketStatus};

pub mod lifecycle;

/// A write that has been sent and not yet answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    target: TicketStatus,
    token: u64,
}

pub struct StatusTransitionManager<B: Backend> {
    scheduler: Arc<PollScheduler<B>>,
    session: Arc<SessionGuard>,
    allowed: Vec<TicketStatus>,
    pending: Arc<DashMap<TicketId, PendingWrite>>,
    tokens: AtomicU64,
}

impl<B: Backend> StatusTransitionManager<B> {
    /// `allowed` lists the statuses a manager may set.
    pub fn new(
        scheduler: Arc<PollScheduler<B>>,
        session: Arc<SessionGuard>,
        allowed: Vec<TicketStatus>,
    ) -> Self {
        StatusTransitionManager {
            scheduler,
            session,
            allowed,
            pending: Arc::new(DashMap::new()),
            tokens: AtomicU64::new(0),
        }
    }

    pub fn allowed_targets(&self) -> &[TicketStatus] {
        &self.allowed
    }

    pub fn is_allowed(&self, status: TicketStatus) -> bool {
        self.allowed.contains(&status)
    }

    /// Target status of the write in flight for `ticket_id`, if any.
    pub fn pending_target(&self, ticket_id: &TicketId) -> Option<TicketStatus> {
        self.pending.get(ticket_id).map(|w| w.target)
    }

    /// All writes in flight.
    pub fn pending_writes(&self) -> Vec<(TicketId, TicketStatus)> {
        self.pending
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().target))
            .collect()
    }

    /// Change a ticket's status.
    ///
    /// Fails locally, without a request, when no manager is logged in, the
    /// target is not a manager status, or the ticket is unknown. On success
    /// the confirmed status is in the store and the ticket list has been
    /// refreshed.
    pub async fn change_status(
        &self,
        ticket_id: &TicketId,
        target: TicketStatus,
    ) -> Result<TicketStatus> {
        self.session.require()?;
        if !self.is_allowed(target) {
            return Err(DeskwatchError::StatusNotAllowed(target));
        }
        let reconciler = self.scheduler.reconciler();
        if reconciler.store().ticket(ticket_id).is_none() {
            return Err(DeskwatchError::TicketNotFound(ticket_id.to_string()));
        }

        let _pending = self.track(ticket_id, target);
        let confirmed = match reconciler.backend().update_status(ticket_id, target).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                tracing::warn!("Failed to set ticket {ticket_id} to {target}: {e}");
                return Err(e);
            }
        };

        reconciler.apply_confirmed_status(ticket_id, confirmed);
        self.scheduler.refresh_tickets().await;
        Ok(confirmed)
    }

    fn track(&self, ticket_id: &TicketId, target: TicketStatus) -> PendingGuard {
        let token = self.tokens.fetch_add(1, Ordering::Relaxed);
        self.pending
            .insert(ticket_id.clone(), PendingWrite { target, token });
        PendingGuard {
            pending: self.pending.clone(),
            ticket_id: ticket_id.clone(),
            token,
        }
    }
}

/// Removes its pending entry when the write finishes, unless a newer write
/// for the same ticket replaced it.
struct PendingGuard {
    pending: Arc<DashMap<TicketId, PendingWrite>>,
    ticket_id: TicketId,
    token: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .remove_if(&self.ticket_id, |_, write| write.token == self.token);
    }
}

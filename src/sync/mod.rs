//! Polling and reconciliation.
//!
//! [`PollScheduler`] owns the timers; [`Reconciler`] turns fetch results into
//! store mutations and decides which results are stale.

mod reconciler;
mod scheduler;

pub use reconciler::{ReconcileOutcome, Reconciler};
pub use scheduler::PollScheduler;

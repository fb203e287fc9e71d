//! Helpdesk backend client.
//!
//! The [`Backend`] trait is the boundary between the engine and the remote
//! source of truth. [`HttpBackend`] talks to the helpdesk REST API over
//! reqwest; tests substitute scripted implementations.

mod http;
mod wire;

use crate::error::Result;
use crate::types::{Message, Ticket, TicketId, TicketStatus};

pub use http::HttpBackend;

/// A manager reply to be posted to a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Manager id sent as `senderId`
    pub sender_id: String,
    pub content: String,
}

/// Trait implemented by helpdesk backends.
///
/// Futures are `Send` so the poll loops can run them on spawned tasks.
pub trait Backend: Send + Sync + 'static {
    /// Fetch the full ticket list.
    fn fetch_tickets(&self) -> impl std::future::Future<Output = Result<Vec<Ticket>>> + Send;

    /// Fetch the whole message thread of one ticket.
    fn fetch_thread(
        &self,
        ticket_id: &TicketId,
    ) -> impl std::future::Future<Output = Result<Vec<Message>>> + Send;

    /// Post a message to a ticket.
    fn post_message(
        &self,
        ticket_id: &TicketId,
        message: &OutgoingMessage,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Set a ticket's status. Returns the status the backend recorded.
    fn update_status(
        &self,
        ticket_id: &TicketId,
        status: TicketStatus,
    ) -> impl std::future::Future<Output = Result<TicketStatus>> + Send;

    /// Assign a ticket to a manager. Returns the status the backend recorded,
    /// which is `in_progress` for the helpdesk API.
    fn assign_manager(
        &self,
        ticket_id: &TicketId,
        manager_id: &str,
    ) -> impl std::future::Future<Output = Result<TicketStatus>> + Send;

    /// Check that the backend is reachable and healthy.
    fn health(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

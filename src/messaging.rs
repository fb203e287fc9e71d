//! Manager replies and ticket assignment.

use std::sync::Arc;

use crate::backend::{Backend, OutgoingMessage};
use crate::error::{DeskwatchError, Result};
use crate::session::SessionGuard;
use crate::sync::PollScheduler;
use crate::types::{TicketId, TicketStatus};
use crate::utils::char_len;

/// Longest reply the helpdesk API accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Trim a reply and check its length.
pub fn validate_content(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DeskwatchError::InvalidMessage(
            "message must not be empty".to_string(),
        ));
    }
    let len = char_len(content);
    if len > MAX_MESSAGE_CHARS {
        return Err(DeskwatchError::InvalidMessage(format!(
            "message is {len} characters, the limit is {MAX_MESSAGE_CHARS}"
        )));
    }
    Ok(content)
}

pub struct Messenger<B: Backend> {
    scheduler: Arc<PollScheduler<B>>,
    session: Arc<SessionGuard>,
}

impl<B: Backend> Messenger<B> {
    pub fn new(scheduler: Arc<PollScheduler<B>>, session: Arc<SessionGuard>) -> Self {
        Messenger { scheduler, session }
    }

    /// Post a reply as the logged-in manager. If the ticket is focused its
    /// thread is refreshed right away.
    pub async fn send_message(&self, ticket_id: &TicketId, content: &str) -> Result<()> {
        let session = self.session.require()?;
        let content = validate_content(content)?;

        let message = OutgoingMessage {
            sender_id: session.manager_id,
            content: content.to_string(),
        };
        let reconciler = self.scheduler.reconciler();
        if let Err(e) = reconciler.backend().post_message(ticket_id, &message).await {
            tracing::warn!("Failed to send message to ticket {ticket_id}: {e}");
            return Err(e);
        }

        if reconciler.store().focus().as_ref() == Some(ticket_id) {
            reconciler.refresh_thread(ticket_id).await;
        }
        Ok(())
    }

    /// Assign the ticket to the logged-in manager. The backend moves it to
    /// `in_progress`; that status is applied once confirmed.
    pub async fn take_ticket(&self, ticket_id: &TicketId) -> Result<TicketStatus> {
        let session = self.session.require()?;

        let reconciler = self.scheduler.reconciler();
        let confirmed = match reconciler
            .backend()
            .assign_manager(ticket_id, &session.manager_id)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Failed to assign ticket {ticket_id}: {e}");
                return Err(e);
            }
        };

        reconciler.apply_confirmed_status(ticket_id, confirmed);
        self.scheduler.refresh_tickets().await;
        Ok(confirmed)
    }
}

//! Ticket list views: filtering and per-status counts.

use std::fmt;

use crate::types::{Ticket, TicketStatus};

/// Which tickets a list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketFilter {
    #[default]
    All,
    Status(TicketStatus),
}

impl TicketFilter {
    /// Tickets handed over to a human.
    pub const fn escalated() -> Self {
        TicketFilter::Status(TicketStatus::Escalated)
    }

    /// Tickets the AI is still working on.
    pub const fn ai_processing() -> Self {
        TicketFilter::Status(TicketStatus::AiProcessing)
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        match self {
            TicketFilter::All => true,
            TicketFilter::Status(status) => ticket.status == *status,
        }
    }

    /// Tickets passing the filter, in list order.
    pub fn apply<'a>(&self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        tickets.iter().filter(|t| self.matches(t)).collect()
    }
}

impl fmt::Display for TicketFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketFilter::All => f.write_str("all"),
            TicketFilter::Status(status) => write!(f, "{status}"),
        }
    }
}

/// Counts of tickets by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub new: usize,
    pub ai_processing: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub escalated: usize,
    pub closed: usize,
}

impl StatusCounts {
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let mut counts = StatusCounts::default();
        for ticket in tickets {
            *counts.slot(ticket.status) += 1;
        }
        counts
    }

    fn slot(&mut self, status: TicketStatus) -> &mut usize {
        match status {
            TicketStatus::New => &mut self.new,
            TicketStatus::AiProcessing => &mut self.ai_processing,
            TicketStatus::InProgress => &mut self.in_progress,
            TicketStatus::Resolved => &mut self.resolved,
            TicketStatus::Escalated => &mut self.escalated,
            TicketStatus::Closed => &mut self.closed,
        }
    }

    /// Get count for a specific status
    pub fn for_status(&self, status: TicketStatus) -> usize {
        match status {
            TicketStatus::New => self.new,
            TicketStatus::AiProcessing => self.ai_processing,
            TicketStatus::InProgress => self.in_progress,
            TicketStatus::Resolved => self.resolved,
            TicketStatus::Escalated => self.escalated,
            TicketStatus::Closed => self.closed,
        }
    }

    /// Count of tickets the filter would show
    pub fn for_filter(&self, filter: TicketFilter) -> usize {
        match filter {
            TicketFilter::All => self.total(),
            TicketFilter::Status(status) => self.for_status(status),
        }
    }

    pub fn total(&self) -> usize {
        TicketStatus::ALL.iter().map(|s| self.for_status(*s)).sum()
    }
}

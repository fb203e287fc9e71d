//! Ticket lifecycle edges.
//!
//! `new → ai_processing → {resolved, escalated, in_progress} → closed`, with
//! `escalated` reachable from every state before `closed`.

use crate::types::TicketStatus;

/// Every edge of the lifecycle, as `(from, to)`.
pub const EDGES: &[(TicketStatus, TicketStatus)] = &[
    (TicketStatus::New, TicketStatus::AiProcessing),
    (TicketStatus::AiProcessing, TicketStatus::Resolved),
    (TicketStatus::AiProcessing, TicketStatus::Escalated),
    (TicketStatus::AiProcessing, TicketStatus::InProgress),
    (TicketStatus::New, TicketStatus::Escalated),
    (TicketStatus::InProgress, TicketStatus::Escalated),
    (TicketStatus::Resolved, TicketStatus::Escalated),
    (TicketStatus::Resolved, TicketStatus::Closed),
    (TicketStatus::Escalated, TicketStatus::Closed),
    (TicketStatus::InProgress, TicketStatus::Closed),
];

/// Returns true if `from → to` is an edge of the lifecycle.
pub fn is_edge(from: TicketStatus, to: TicketStatus) -> bool {
    EDGES.iter().any(|&(f, t)| f == from && t == to)
}

/// Statuses directly reachable from `from`.
pub fn successors(from: TicketStatus) -> impl Iterator<Item = TicketStatus> {
    EDGES
        .iter()
        .filter(move |(f, _)| *f == from)
        .map(|&(_, t)| t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_reachable_before_close() {
        for status in TicketStatus::ALL {
            if status == TicketStatus::Escalated {
                continue;
            }
            assert_eq!(
                is_edge(status, TicketStatus::Escalated),
                !status.is_terminal(),
                "{status} -> escalated"
            );
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        assert_eq!(successors(TicketStatus::Closed).count(), 0);
        for status in TicketStatus::ALL {
            assert!(!is_edge(TicketStatus::Closed, status));
        }
    }

    #[test]
    fn test_main_path() {
        assert!(is_edge(TicketStatus::New, TicketStatus::AiProcessing));
        assert!(is_edge(TicketStatus::AiProcessing, TicketStatus::Resolved));
        assert!(is_edge(TicketStatus::Resolved, TicketStatus::Closed));
        assert!(!is_edge(TicketStatus::New, TicketStatus::Resolved));
        assert!(!is_edge(TicketStatus::Resolved, TicketStatus::New));
    }

    #[test]
    fn test_successors_of_ai_processing() {
        let mut next: Vec<_> = successors(TicketStatus::AiProcessing)
            .map(|s| s.as_str())
            .collect();
        next.sort();
        insta::assert_snapshot!(next.join(","), @"escalated,in_progress,resolved");
    }
}

//! AI performance indicators for the focused ticket.
//!
//! Metrics are derived from the thread on every read and never cached.

use jiff::Timestamp;

use crate::types::{Message, SenderType, TicketStatus};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThreadMetrics {
    /// Mean AI confidence as a whole percentage, 0 when no AI message has one
    pub confidence: u32,
    /// Number of AI messages
    pub iterations: usize,
    /// 1 if the ticket is currently escalated
    pub escalations: u8,
    /// Mean seconds from an unanswered customer message to the next AI or
    /// manager reply
    pub avg_response_secs: Option<f64>,
}

impl ThreadMetrics {
    /// Compute metrics for a thread and the status of its ticket.
    pub fn compute(thread: &[Message], status: TicketStatus) -> Self {
        let confidences: Vec<f64> = thread
            .iter()
            .filter(|m| m.is_ai())
            .filter_map(|m| m.ai_confidence)
            .collect();
        let confidence = if confidences.is_empty() {
            0
        } else {
            let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
            (mean * 100.0).round() as u32
        };

        ThreadMetrics {
            confidence,
            iterations: thread.iter().filter(|m| m.is_ai()).count(),
            escalations: u8::from(status == TicketStatus::Escalated),
            avg_response_secs: average_response(thread),
        }
    }
}

fn average_response(thread: &[Message]) -> Option<f64> {
    let mut waiting_since: Option<Timestamp> = None;
    let mut delays = Vec::new();

    for message in thread {
        match message.sender {
            SenderType::Customer => {
                waiting_since.get_or_insert(message.created_at);
            }
            SenderType::Ai | SenderType::Manager => {
                if let Some(since) = waiting_since.take() {
                    let millis = message.created_at.as_millisecond() - since.as_millisecond();
                    delays.push(millis.max(0) as f64 / 1000.0);
                }
            }
        }
    }

    if delays.is_empty() {
        None
    } else {
        Some(delays.iter().sum::<f64>() / delays.len() as f64)
    }
}

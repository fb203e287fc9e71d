//! Scripted in-memory backend for engine tests.
//!
//! Responses are captured when a request is issued and may be held back
//! with a gate, so tests can control the order in which fetches complete.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use jiff::Timestamp;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::backend::{Backend, OutgoingMessage};
use crate::error::{DeskwatchError, Result};
use crate::types::{Message, SenderType, Ticket, TicketId, TicketStatus};

pub(crate) fn ts(second: i64) -> Timestamp {
    Timestamp::from_second(1_714_557_600 + second).unwrap()
}

pub(crate) fn ticket(id: &str, status: TicketStatus) -> Ticket {
    Ticket::new(id, status, ts(0))
}

pub(crate) fn message(id: &str, sender: SenderType, second: i64) -> Message {
    Message::new(sender, format!("message {id}"), ts(second)).with_id(id)
}

fn scripted_failure(status: reqwest::StatusCode, endpoint: &str) -> DeskwatchError {
    DeskwatchError::UnexpectedStatus {
        status,
        endpoint: endpoint.to_string(),
    }
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    tickets: Mutex<Vec<Ticket>>,
    threads: Mutex<HashMap<TicketId, Vec<Message>>>,
    list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    thread_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    fail_fetches: AtomicBool,
    fail_writes: AtomicBool,
    list_calls: AtomicUsize,
    thread_calls: Mutex<Vec<TicketId>>,
    pub status_calls: Mutex<Vec<(TicketId, TicketStatus)>>,
    pub posted: Mutex<Vec<(TicketId, OutgoingMessage)>>,
    pub assigned: Mutex<Vec<(TicketId, String)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tickets(&self, tickets: Vec<Ticket>) {
        *self.tickets.lock() = tickets;
    }

    pub fn set_thread(&self, ticket_id: &str, messages: Vec<Message>) {
        self.threads.lock().insert(TicketId::from(ticket_id), messages);
    }

    /// Hold the next list fetch until the returned sender fires or drops.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().push_back(rx);
        tx
    }

    /// Hold the next thread fetch until the returned sender fires or drops.
    pub fn hold_next_thread(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.thread_gates.lock().push_back(rx);
        tx
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn thread_calls_for(&self, ticket_id: &str) -> usize {
        self.thread_calls
            .lock()
            .iter()
            .filter(|id| id.as_str() == ticket_id)
            .count()
    }

    fn write_result(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(scripted_failure(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                "scripted write",
            ));
        }
        Ok(())
    }

    fn set_ticket_status(&self, ticket_id: &TicketId, status: TicketStatus) {
        if let Some(ticket) = self.tickets.lock().iter_mut().find(|t| &t.id == ticket_id) {
            ticket.status = status;
        }
    }
}

impl Backend for ScriptedBackend {
    async fn fetch_tickets(&self) -> Result<Vec<Ticket>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_fetches.load(Ordering::SeqCst);
        let response = self.tickets.lock().clone();
        let gate = self.list_gates.lock().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if fail {
            return Err(scripted_failure(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
                "scripted fetch",
            ));
        }
        Ok(response)
    }

    async fn fetch_thread(&self, ticket_id: &TicketId) -> Result<Vec<Message>> {
        self.thread_calls.lock().push(ticket_id.clone());
        let fail = self.fail_fetches.load(Ordering::SeqCst);
        let response = self.threads.lock().get(ticket_id).cloned().unwrap_or_default();
        let gate = self.thread_gates.lock().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if fail {
            return Err(scripted_failure(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
                "scripted fetch",
            ));
        }
        Ok(response)
    }

    async fn post_message(&self, ticket_id: &TicketId, message: &OutgoingMessage) -> Result<()> {
        self.write_result()?;
        self.posted.lock().push((ticket_id.clone(), message.clone()));
        let mut threads = self.threads.lock();
        let thread = threads.entry(ticket_id.clone()).or_default();
        let next = thread.last().map(|m| m.created_at.as_second() + 1).unwrap_or(0);
        let created_at = Timestamp::from_second(next).unwrap();
        thread.push(
            Message::new(SenderType::Manager, message.content.clone(), created_at)
                .with_id(format!("posted-{}", thread.len())),
        );
        Ok(())
    }

    async fn update_status(
        &self,
        ticket_id: &TicketId,
        status: TicketStatus,
    ) -> Result<TicketStatus> {
        self.write_result()?;
        self.status_calls.lock().push((ticket_id.clone(), status));
        self.set_ticket_status(ticket_id, status);
        Ok(status)
    }

    async fn assign_manager(
        &self,
        ticket_id: &TicketId,
        manager_id: &str,
    ) -> Result<TicketStatus> {
        self.write_result()?;
        self.assigned
            .lock()
            .push((ticket_id.clone(), manager_id.to_string()));
        self.set_ticket_status(ticket_id, TicketStatus::InProgress);
        Ok(TicketStatus::InProgress)
    }

    async fn health(&self) -> Result<()> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(scripted_failure(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
                "scripted fetch",
            ));
        }
        Ok(())
    }
}

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DeskwatchError, Result};
use crate::utils::ellipsize;

/// Shown in place of a preview when a ticket has no first message.
pub const NO_PREVIEW: &str = "(no message)";

/// Opaque, stable ticket identifier. The only merge key for tickets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    pub fn new(id: impl Into<String>) -> Self {
        TicketId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TicketId {
    fn from(s: &str) -> Self {
        TicketId(s.to_string())
    }
}

impl From<String> for TicketId {
    fn from(s: String) -> Self {
        TicketId(s)
    }
}

/// Ticket lifecycle status.
///
/// Union of the statuses used by the AI monitoring backend (`ai_processing`,
/// `escalated`) and the manager backend (`in_progress`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    New,
    AiProcessing,
    InProgress,
    Resolved,
    Escalated,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 6] = [
        TicketStatus::New,
        TicketStatus::AiProcessing,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Escalated,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::AiProcessing => "ai_processing",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Escalated => "escalated",
            TicketStatus::Closed => "closed",
        }
    }

    /// Returns true for the terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = DeskwatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(TicketStatus::New),
            "ai_processing" => Ok(TicketStatus::AiProcessing),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "escalated" => Ok(TicketStatus::Escalated),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(DeskwatchError::InvalidStatus(s.to_string())),
        }
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderType {
    Customer,
    Ai,
    Manager,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Customer => "customer",
            SenderType::Ai => "ai",
            SenderType::Manager => "manager",
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = DeskwatchError;

    /// Backends disagree on the customer's name: `client` (manager API),
    /// `user` (monitoring API) and `customer` all mean the same sender.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "client" | "user" => Ok(SenderType::Customer),
            "ai" => Ok(SenderType::Ai),
            "manager" => Ok(SenderType::Manager),
            _ => Err(DeskwatchError::InvalidSender(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Attachment carried by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub kind: MediaKind,
    pub url: Option<String>,
    /// Channel-side file handle, when the backend only stored that
    pub file_id: Option<String>,
}

/// One support case as reported by the backend's ticket list.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: TicketId,
    /// Human-facing sequence number, display only
    pub ticket_number: String,
    pub status: TicketStatus,
    pub created_at: Timestamp,
    /// Present iff the ticket has ever escalated
    pub escalated_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub customer_handle: String,
    pub customer_id: String,
    pub first_message_preview: String,
    /// Server-side counter; may lag the thread between polls
    pub message_count: u32,
    pub ai_summary: Option<String>,
    pub assigned_manager_id: Option<String>,
}

impl Ticket {
    /// Minimal ticket with empty display fields.
    pub fn new(id: impl Into<TicketId>, status: TicketStatus, created_at: Timestamp) -> Self {
        let id = id.into();
        Ticket {
            ticket_number: id.to_string(),
            id,
            status,
            created_at,
            escalated_at: None,
            updated_at: None,
            customer_handle: String::new(),
            customer_id: String::new(),
            first_message_preview: String::new(),
            message_count: 0,
            ai_summary: None,
            assigned_manager_id: None,
        }
    }

    /// First-message preview cut to `max_chars`, or a placeholder.
    pub fn preview(&self, max_chars: usize) -> String {
        let text = self.first_message_preview.trim();
        if text.is_empty() {
            NO_PREVIEW.to_string()
        } else {
            ellipsize(text, max_chars)
        }
    }

    pub fn has_escalated(&self) -> bool {
        self.escalated_at.is_some()
    }
}

/// Ordering key of a message within its thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Id(String),
    Index(usize),
}

/// One message in a ticket's thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Option<String>,
    pub sender: SenderType,
    /// May be empty when media is attached
    pub content: String,
    pub media: Option<Media>,
    /// In `[0, 1]`; only ever set on AI messages
    pub ai_confidence: Option<f64>,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(sender: SenderType, content: impl Into<String>, created_at: Timestamp) -> Self {
        Message {
            id: None,
            sender,
            content: content.into(),
            media: None,
            ai_confidence: None,
            created_at,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a confidence score. Ignored unless the sender is the AI;
    /// clamped to `[0, 1]`, dropped if not finite.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.ai_confidence = normalize_confidence(self.sender, Some(confidence));
        self
    }

    /// Stable key: the backend id when present, else the position.
    pub fn key(&self, index: usize) -> MessageKey {
        match &self.id {
            Some(id) => MessageKey::Id(id.clone()),
            None => MessageKey::Index(index),
        }
    }

    pub fn is_ai(&self) -> bool {
        self.sender == SenderType::Ai
    }
}

pub(crate) fn normalize_confidence(sender: SenderType, confidence: Option<f64>) -> Option<f64> {
    if sender != SenderType::Ai {
        return None;
    }
    confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive ISO-8601 date-time which is
/// read as UTC (what a `TIMESTAMP` column serialized by `isoformat()` looks like).
pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<Timestamp>() {
        return Ok(ts);
    }
    let civil: jiff::civil::DateTime = s
        .parse()
        .map_err(|_| DeskwatchError::InvalidTimestamp(s.to_string()))?;
    civil
        .to_zoned(jiff::tz::TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|_| DeskwatchError::InvalidTimestamp(s.to_string()))
}

//! JSON shapes of the helpdesk API and their conversion to domain types.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::types::{
    Media, MediaKind, Message, SenderType, Ticket, TicketId, TicketStatus, normalize_confidence,
    parse_timestamp,
};

/// Identifiers arrive as integers from the SQL backend but are opaque here.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Int(i64),
    Str(String),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Int(n) => n.to_string(),
            IdValue::Str(s) => s,
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    IdValue::deserialize(deserializer).map(IdValue::into_string)
}

fn opt_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<IdValue>::deserialize(deserializer)?.map(IdValue::into_string))
}

/// One row of `GET /tickets`, or the body of a status/assign response.
#[derive(Debug, Deserialize)]
pub(super) struct TicketRecord {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    ticket_number: Option<String>,
    status: String,
    created_at: String,
    #[serde(default)]
    escalated_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    telegram_username: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    telegram_user_id: Option<String>,
    #[serde(default)]
    first_message: Option<String>,
    #[serde(default)]
    message_count: Option<u32>,
    #[serde(default)]
    ai_summary: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    assigned_manager_id: Option<String>,
}

impl TicketRecord {
    pub(super) fn status(&self) -> Result<TicketStatus> {
        self.status.parse()
    }

    pub(super) fn into_ticket(self) -> Result<Ticket> {
        let status = self.status()?;
        let created_at = parse_timestamp(&self.created_at)?;

        let mut escalated_at = optional_timestamp(&self.id, "escalated_at", self.escalated_at);
        if let Some(at) = escalated_at
            && at < created_at
        {
            tracing::warn!(
                "Ticket {} has escalated_at before created_at, ignoring escalated_at",
                self.id
            );
            escalated_at = None;
        }
        let updated_at = optional_timestamp(&self.id, "updated_at", self.updated_at);

        Ok(Ticket {
            ticket_number: self.ticket_number.unwrap_or_else(|| self.id.clone()),
            id: TicketId::new(self.id),
            status,
            created_at,
            escalated_at,
            updated_at,
            customer_handle: self.telegram_username.unwrap_or_default(),
            customer_id: self.telegram_user_id.unwrap_or_default(),
            first_message_preview: self.first_message.unwrap_or_default(),
            message_count: self.message_count.unwrap_or(0),
            ai_summary: self.ai_summary.filter(|s| !s.trim().is_empty()),
            assigned_manager_id: self.assigned_manager_id,
        })
    }
}

fn optional_timestamp(
    ticket_id: &str,
    field: &str,
    value: Option<String>,
) -> Option<jiff::Timestamp> {
    let raw = value?;
    match parse_timestamp(&raw) {
        Ok(ts) => Some(ts),
        Err(e) => {
            tracing::warn!("Ticket {ticket_id} has unreadable {field}: {e}");
            None
        }
    }
}

/// Body of `GET /tickets/{id}`. The `ticket` and `pagination` members are
/// not needed.
#[derive(Debug, Deserialize)]
pub(super) struct ThreadResponse {
    #[serde(default)]
    messages: Option<Vec<MessageRecord>>,
}

impl ThreadResponse {
    pub(super) fn into_messages(self) -> Result<Vec<Message>> {
        self.messages
            .unwrap_or_default()
            .into_iter()
            .map(MessageRecord::into_message)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct MessageRecord {
    #[serde(default, deserialize_with = "opt_id_string")]
    id: Option<String>,
    sender_type: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    media_url: Option<String>,
    #[serde(default)]
    media_file_id: Option<String>,
    #[serde(default)]
    ai_confidence: Option<f64>,
    created_at: String,
}

impl MessageRecord {
    fn into_message(self) -> Result<Message> {
        let sender: SenderType = self.sender_type.parse()?;
        let created_at = parse_timestamp(&self.created_at)?;

        let media = match self.media_type.as_deref() {
            None | Some("") => None,
            Some("photo") => Some(MediaKind::Photo),
            Some("video") => Some(MediaKind::Video),
            Some(other) => {
                tracing::warn!("Ignoring unsupported media type '{other}'");
                None
            }
        }
        .map(|kind| Media {
            kind,
            url: self.media_url,
            file_id: self.media_file_id,
        });

        Ok(Message {
            id: self.id,
            sender,
            content: self.content.unwrap_or_default(),
            media,
            ai_confidence: normalize_confidence(sender, self.ai_confidence),
            created_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MessageBody<'a> {
    pub sender_type: &'static str,
    pub sender_id: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusBody {
    pub status: TicketStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AssignBody {
    pub manager_id: ManagerIdValue,
}

/// The API takes numeric manager ids; non-numeric ids are sent verbatim.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum ManagerIdValue {
    Int(u64),
    Str(String),
}

impl ManagerIdValue {
    pub(super) fn new(manager_id: &str) -> Self {
        match manager_id.trim().parse::<u64>() {
            Ok(n) => ManagerIdValue::Int(n),
            Err(_) => ManagerIdValue::Str(manager_id.to_string()),
        }
    }
}

/// Parse a ticket list body. One unreadable record fails the whole list.
pub(super) fn parse_ticket_list(body: &str) -> Result<Vec<Ticket>> {
    let records: Vec<TicketRecord> = serde_json::from_str(body)?;
    records.into_iter().map(TicketRecord::into_ticket).collect()
}

pub(super) fn parse_thread(body: &str) -> Result<Vec<Message>> {
    let response: ThreadResponse = serde_json::from_str(body)?;
    response.into_messages()
}

/// Status recorded in a write response, or the requested one if the body
/// does not carry a ticket row.
pub(super) fn confirmed_status(body: &str, requested: TicketStatus) -> Result<TicketStatus> {
    match serde_json::from_str::<TicketRecord>(body) {
        Ok(record) => record.status(),
        Err(e) => {
            tracing::debug!("Write response carries no ticket row ({e}), assuming {requested}");
            Ok(requested)
        }
    }
}

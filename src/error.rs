use thiserror::Error;

use crate::types::TicketStatus;

#[derive(Error, Debug)]
pub enum DeskwatchError {
    #[error("ticket '{0}' not found")]
    TicketNotFound(String),

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("invalid sender type '{0}'")]
    InvalidSender(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    // Local validation errors: rejected before any request is issued
    #[error("no manager session: log in before changing tickets")]
    NotLoggedIn,

    #[error("status '{0}' cannot be set by a manager")]
    StatusNotAllowed(TicketStatus),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid session: {0}")]
    InvalidSession(String),

    // Backend errors
    #[error("backend returned {status} for {endpoint}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DeskwatchError {
    /// True for failures detected locally, before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DeskwatchError::NotLoggedIn
                | DeskwatchError::StatusNotAllowed(_)
                | DeskwatchError::InvalidMessage(_)
                | DeskwatchError::InvalidSession(_)
                | DeskwatchError::TicketNotFound(_)
        )
    }

    /// True for network failures and server-side (5xx) rejections.
    pub fn is_transient(&self) -> bool {
        match self {
            DeskwatchError::UnexpectedStatus { status, .. } => status.is_server_error(),
            DeskwatchError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeskwatchError>;

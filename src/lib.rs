pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod messaging;
pub mod metrics;
pub mod paths;
pub mod session;
pub mod status;
pub mod store;
pub mod sync;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_guards;
#[cfg(test)]
mod testing;

pub use backend::{Backend, HttpBackend, OutgoingMessage};
pub use config::{Config, PollConfig};
pub use engine::SyncEngine;
pub use error::{DeskwatchError, Result};
pub use filter::{StatusCounts, TicketFilter};
pub use metrics::ThreadMetrics;
pub use session::{FileSessionStore, ManagerSession, MemorySessionStore, SessionGuard, SessionStore};
pub use status::StatusTransitionManager;
pub use store::{StoreEvent, StoreSnapshot, SyncHealth, TicketStore};
pub use sync::{PollScheduler, ReconcileOutcome, Reconciler};
pub use types::{
    Media, MediaKind, Message, MessageKey, SenderType, Ticket, TicketId, TicketStatus,
    parse_timestamp,
};

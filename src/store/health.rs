use jiff::Timestamp;

/// Connectivity of the ticket-list poll, for the console's status indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncHealth {
    /// When the ticket list last synced successfully
    pub last_success: Option<Timestamp>,
    /// Failed list fetches since the last success
    pub consecutive_failures: u32,
}

impl SyncHealth {
    /// Online until proven otherwise: one failed poll is not an outage.
    pub fn is_online(&self) -> bool {
        self.consecutive_failures < 2
    }

    pub(crate) fn record_success(&mut self, at: Timestamp) {
        self.last_success = Some(at);
        self.consecutive_failures = 0;
    }

    pub(crate) fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

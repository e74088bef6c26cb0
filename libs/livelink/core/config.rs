use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`crate::ConnectionManager`]
///
/// Built through [`crate::ConnectionManagerBuilder`]; the endpoint itself is
/// supplied to `open()` since it depends on the session identity.
pub struct ConnectionConfig {
    /// Reconnection strategy consulted after every unsolicited disconnect
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// Optional header provider for the handshake request
    pub(crate) headers: Option<Arc<dyn HeaderProvider>>,

    /// Extra wait added to every reconnection delay
    pub(crate) reconnection_delay_offset: Duration,

    /// Upper bound for a single connect attempt
    pub(crate) connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn has_headers(&self) -> bool {
        self.headers.is_some()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Delay before retry number `attempt`, including the offset
    pub(crate) fn retry_delay(&self, attempt: usize) -> Option<Duration> {
        self.reconnect_strategy
            .next_delay(attempt)
            .map(|delay| delay + self.reconnection_delay_offset)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_strategy: Box::new(ExponentialBackoff::conservative()),
            headers: None,
            reconnection_delay_offset: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

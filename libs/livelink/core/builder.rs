use crate::core::client::ConnectionManager;
use crate::core::config::ConnectionConfig;
use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ConnectionManager`]
///
/// Every setting has a default, so `ConnectionManager::builder().build()`
/// yields a manager with conservative exponential backoff and no headers.
pub struct ConnectionManagerBuilder {
    config: ConnectionConfig,
}

impl ConnectionManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: ConnectionConfig::default(),
        }
    }

    /// Set the reconnection strategy
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.config.reconnect_strategy = Box::new(strategy);
        self
    }

    /// Set a header provider for the handshake
    pub fn headers(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.config.headers = Some(Arc::new(provider));
        self
    }

    /// Shorthand for a static bearer credential
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.headers(BearerToken::new(token))
    }

    /// Wait this long in addition to every strategy delay
    pub fn reconnection_delay_offset(mut self, offset: Duration) -> Self {
        self.config.reconnection_delay_offset = offset;
        self
    }

    /// Upper bound for a single connect attempt
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> ConnectionManager {
        ConnectionManager::new(self.config)
    }
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection_state::ConnectionState;

    #[test]
    fn test_builder_defaults() {
        let link = ConnectionManagerBuilder::new().build();
        assert_eq!(link.state(), ConnectionState::Disconnected);
        assert!(!link.config().has_headers());
        assert_eq!(link.config().connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_retry_delay_includes_offset() {
        let link = ConnectionManagerBuilder::new()
            .reconnect_strategy(FixedDelay::once(Duration::from_millis(100)))
            .reconnection_delay_offset(Duration::from_millis(50))
            .bearer_token("t")
            .build();

        assert!(link.config().has_headers());
        assert_eq!(link.config().retry_delay(0), Some(Duration::from_millis(150)));
        assert_eq!(link.config().retry_delay(1), None);
    }
}

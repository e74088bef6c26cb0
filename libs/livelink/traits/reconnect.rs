use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// The connection manager consults the strategy after every transport failure
/// that was not caused by an explicit `close()`.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - Number of retries already scheduled since the last
    ///   successful connect (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if another attempt is allowed
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Exponential backoff reconnection strategy
///
/// Delays grow as `initial_delay * 2^attempt`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - The delay before the first retry
    /// * `max_delay` - Upper bound for any single delay
    /// * `max_attempts` - Maximum number of retries (None = unlimited)
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// 500ms doubling up to 8s, five retries
    pub fn conservative() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(8), Some(5))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::conservative()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let factor = 1u64.checked_shl(attempt.min(32) as u32).unwrap_or(u64::MAX);
        let initial = self.initial_delay.as_millis() as u64;
        let delay = initial.saturating_mul(factor);
        let cap = self.max_delay.as_millis() as u64;
        Some(Duration::from_millis(delay.min(cap)))
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection strategy
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }

    /// A single retry after `delay`
    pub fn once(delay: Duration) -> Self {
        Self::new(delay, Some(1))
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        self.should_reconnect(attempt).then_some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never reconnect strategy
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}

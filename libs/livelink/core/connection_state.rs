//! Lock-free connection state and counters shared between the
//! connection manager handle and its I/O task.

use crate::traits::{LinkError, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Connection state machine
///
/// ```text
/// Disconnected --open--> Connecting --ready--> Connected
///      ^                     |                     |
///      +------ failure ------+------ drop ---------+
///
/// Connecting | Connected | Disconnected --close--> Closing --> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Closing = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Closing,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Whether `self -> next` is an edge of the state machine
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
                | (Disconnected, Closing)
                | (Connecting, Closing)
                | (Connected, Closing)
                | (Closing, Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Atomic holder for [`ConnectionState`]
///
/// The only mutator is [`AtomicConnectionState::transition`], which refuses
/// edges that are not part of the state machine.
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    /// Move to `next`, returning the previous state
    pub fn transition(&self, next: ConnectionState) -> Result<ConnectionState> {
        let mut current = self.inner.load(Ordering::Acquire);
        loop {
            let from = ConnectionState::from_u8(current);
            if !from.can_transition_to(next) {
                return Err(LinkError::InvalidTransition { from, to: next });
            }
            match self.inner.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Snapshot of link counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// Atomic link counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    sent: AtomicU64,
    received: AtomicU64,
    reconnects: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, connection_state: ConnectionState) -> Metrics {
        Metrics {
            messages_sent: self.messages_sent(),
            messages_received: self.messages_received(),
            reconnect_count: self.reconnect_count(),
            connection_state,
        }
    }
}

use crate::core::connection_state::ConnectionState;
use thiserror::Error;

/// Main error type for livelink
///
/// None of these reach the owner of a [`crate::ConnectionManager`] during normal
/// operation: transport failures are turned into state transitions. They are
/// returned by the lower-level pieces and logged by the I/O task.
#[derive(Error, Debug)]
pub enum LinkError {
    /// WebSocket protocol or I/O error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed by the remote end
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Handshake request could not be built
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connect attempt exceeded the configured timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Command channel to the I/O task is gone
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Requested transition is not part of the state machine
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

/// Result type for livelink operations
pub type Result<T> = std::result::Result<T, LinkError>;

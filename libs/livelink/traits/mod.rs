//! # LiveLink Traits
//!
//! Pluggable pieces of the connection manager:
//!
//! - **ReconnectionStrategy**: how long to wait before the next connect attempt
//! - **HeaderProvider**: handshake headers (bearer credentials)
//! - **WsMessage**: the frame type observers receive and `send` accepts

pub mod error;
pub mod headers;
pub mod message;
pub mod reconnect;

pub use error::{LinkError, Result};
pub use headers::{BearerToken, HeaderProvider, Headers};
pub use message::WsMessage;
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};

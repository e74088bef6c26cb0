//! # LiveLink
//!
//! A session-scoped duplex WebSocket connection for dashboard clients.
//!
//! ## Features
//!
//! - **Explicit state machine**: `Disconnected → Connecting → Connected → Closing`,
//!   every transition validated and reported to observers
//! - **Observer registration**: frame, state-change and send-failure observers,
//!   invoked in arrival order from a single I/O task
//! - **Bounded reconnection**: pluggable strategies, exponential backoff by default
//! - **Send tickets**: every accepted send gets a ticket; tickets that never reach
//!   the wire are reported back exactly once
//!
//! ## Example
//!
//! ```rust,ignore
//! use livelink::{ConnectionManager, ExponentialBackoff, WsMessage};
//!
//! let link = ConnectionManager::builder()
//!     .reconnect_strategy(ExponentialBackoff::conservative())
//!     .build();
//!
//! link.on_message(|frame| println!("frame: {:?}", frame));
//! link.on_state_change(|state| println!("state: {}", state));
//! link.open("ws://localhost:8000/ws/worker/7");
//!
//! if let Some(ticket) = link.send(WsMessage::text("hello")) {
//!     println!("queued as {:?}", ticket);
//! }
//! link.close();
//! ```

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use crate::core::{
    builder::ConnectionManagerBuilder,
    client::{ConnectionManager, SendTicket},
    config::ConnectionConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics},
};

/// Type alias for Result with LinkError
pub type Result<T> = std::result::Result<T, traits::LinkError>;

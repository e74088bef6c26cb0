//! Connection manager internals: builder, configuration, the state machine
//! and the I/O task.

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;

pub use builder::ConnectionManagerBuilder;
pub use client::{ConnectionManager, SendTicket};
pub use config::ConnectionConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};

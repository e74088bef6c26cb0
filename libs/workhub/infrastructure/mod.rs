//! Infrastructure Layer
//!
//! REST message store, the livelink transport adapter, configuration and
//! logging.

pub mod config;
pub mod logging;
pub mod rest;
pub mod transport;

pub use config::{ConfigError, WorkhubConfig};
pub use logging::init_tracing;
pub use rest::RestMessageStore;

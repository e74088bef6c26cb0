//! # Workhub
//!
//! Real-time message sync for the operations dashboard.
//!
//! A session keeps one live connection per authenticated user, merges it
//! with the separately fetched message history, classifies messages by
//! sender, shows outgoing sends optimistically and reconciles them against
//! the server's echo.
//!
//! ## Layers
//!
//! - `domain`: identities, wire events, history records, normalized messages
//! - `application`: classifier, reconciliation store, sync controller,
//!   dashboard state and the session driver
//! - `infrastructure`: REST message store, livelink transport, config, logging
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use workhub::{NoOpCallback, RestMessageStore, SessionIdentity, SyncSession, WorkhubConfig};
//!
//! let config = WorkhubConfig::load("config/workhub.yaml")?;
//! let store = RestMessageStore::new(&config.api.base_url, config.token.clone(), Duration::from_secs(30))?;
//! let session = SyncSession::start(
//!     SessionIdentity::worker(7),
//!     config.session_settings(),
//!     Arc::new(store),
//!     Arc::new(NoOpCallback),
//! );
//! session.send("Need backup").await;
//! session.logout().await;
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    DashboardState, DeliveryMode, MessageStore, NoOpCallback, OptimisticHandle,
    ReconciliationStore, SessionHandle, SessionSettings, SessionSnapshot, SharedDashboardState,
    StoreError, SyncController, SyncEventCallback, SyncSession,
};
pub use domain::{
    ConversationKey, EventKind, HistoryRecord, MessageId, NormalizedMessage, Origin, RawEvent,
    Role, SenderRole, SessionIdentity,
};
pub use infrastructure::{init_tracing, ConfigError, RestMessageStore, WorkhubConfig};

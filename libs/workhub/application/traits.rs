//! Seams between the sync core and its collaborators

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{HistoryRecord, HistoryScope, NormalizedMessage, OutboundFrame, SendRequest};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unauthorized: credential rejected")]
    Unauthorized,

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),

    #[error("Rate limit exceeded")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persisted messages behind the REST API
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Ordered page of persisted messages for `scope`
    async fn fetch_history(&self, scope: HistoryScope) -> Result<Vec<HistoryRecord>>;

    /// Submit a message; the socket echo confirms it
    async fn send_message(&self, request: &SendRequest) -> Result<()>;
}

/// Identifies one transmission handed to a [`Transport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryTicket(pub u64);

/// The live connection as seen by the sync controller
pub trait Transport {
    fn is_connected(&self) -> bool;

    /// Queue a frame; `None` means it was not sent
    fn transmit(&self, frame: &OutboundFrame) -> Option<DeliveryTicket>;
}

/// UI-facing observer of a sync session
///
/// Called from the session task, one event at a time.
pub trait SyncEventCallback: Send + Sync {
    /// The visible sequence changed
    fn on_messages_changed(&self, messages: &[NormalizedMessage]);

    /// An event arrived for a conversation that is not displayed
    fn on_unread(&self, counterparty: i64, unread: u32);

    fn on_connectivity_changed(&self, connected: bool);

    /// History could not be loaded; live messaging continues
    fn on_history_failed(&self, error: &StoreError);
}

/// No-op implementation for when callbacks aren't needed
pub struct NoOpCallback;

impl SyncEventCallback for NoOpCallback {
    fn on_messages_changed(&self, _: &[NormalizedMessage]) {}
    fn on_unread(&self, _: i64, _: u32) {}
    fn on_connectivity_changed(&self, _: bool) {}
    fn on_history_failed(&self, _: &StoreError) {}
}

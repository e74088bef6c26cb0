//! Application Layer
//!
//! The sync core: classification, reconciliation, the controller that ties
//! them to a session, and the task that drives it.

pub mod classifier;
pub mod controller;
pub mod dashboard;
pub mod session;
pub mod store;
pub mod traits;

pub use classifier::{classify, classify_event, classify_history, classify_record, ClassifierInput};
pub use controller::{DeliveryMode, FrameRoute, HistoryRequest, QueuedDelivery, SyncController};
pub use dashboard::{ActivityEntry, DashboardState, SharedDashboardState};
pub use session::{SessionCommand, SessionHandle, SessionSettings, SessionSnapshot, SyncSession};
pub use store::{OptimisticHandle, ReconcileOutcome, ReconciliationStore};
pub use traits::{
    DeliveryTicket, MessageStore, NoOpCallback, StoreError, SyncEventCallback, Transport,
};

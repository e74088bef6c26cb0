//! Domain Layer
//!
//! Session identities, wire events, history records and the normalized
//! message shape shown to the user. Nothing here performs I/O.

pub mod event;
pub mod identity;
pub mod message;

pub use event::{EventKind, HistoryRecord, OutboundFrame, RawEvent, SendRequest};
pub use identity::{ConversationKey, HistoryScope, Role, SessionIdentity};
pub use message::{MessageId, NormalizedMessage, Origin, SenderRole};

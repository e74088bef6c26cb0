//! Normalized message shape

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an entry in the visible sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageId {
    /// Server-assigned id
    Stored(i64),
    /// Per-store monotonic id for optimistic and id-less live entries
    Local(u64),
    /// Classifier output with no server id; the store assigns a local id
    Unassigned,
}

impl MessageId {
    pub fn stored(&self) -> Option<i64> {
        match self {
            MessageId::Stored(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Stored(id) => write!(f, "{}", id),
            MessageId::Local(id) => write!(f, "local-{}", id),
            MessageId::Unassigned => f.write_str("unassigned"),
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Worker,
    Manager,
    Agent,
    System,
}

impl SenderRole {
    /// Parse an explicit role tag (`sender_role`, `sender`)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "user" | "worker" | "you" => Some(SenderRole::User),
            "agent" | "ai" | "assistant" | "bot" => Some(SenderRole::Agent),
            "manager" => Some(SenderRole::Manager),
            "system" => Some(SenderRole::System),
            _ => None,
        }
    }

    /// Worker and User describe the same author
    pub fn is_equivalent(self, other: SenderRole) -> bool {
        self.canonical() == other.canonical()
    }

    fn canonical(self) -> SenderRole {
        match self {
            SenderRole::Worker => SenderRole::User,
            other => other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SenderRole::User => "user",
            SenderRole::Worker => "worker",
            SenderRole::Manager => "manager",
            SenderRole::Agent => "agent",
            SenderRole::System => "system",
        }
    }
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which source an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    History,
    Live,
    Optimistic,
}

/// A message ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub id: MessageId,
    pub content: String,
    pub sender_role: SenderRole,
    pub created_at: DateTime<Utc>,
    pub origin: Origin,
    /// Client-generated correlation token carried through the echo
    pub client_ref: Option<String>,
    pub sender_id: Option<i64>,
}

impl NormalizedMessage {
    pub fn new(
        content: impl Into<String>,
        sender_role: SenderRole,
        created_at: DateTime<Utc>,
        origin: Origin,
    ) -> Self {
        Self {
            id: MessageId::Unassigned,
            content: content.into(),
            sender_role,
            created_at,
            origin,
            client_ref: None,
            sender_id: None,
        }
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn with_client_ref(mut self, client_ref: impl Into<String>) -> Self {
        self.client_ref = Some(client_ref.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.origin == Origin::Optimistic
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

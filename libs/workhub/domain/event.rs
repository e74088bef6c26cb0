//! Wire-level events, persisted records and outbound frames

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::identity::{Role, SessionIdentity};

/// Event kind carried in the `type` field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    WorkerMessage,
    AiResponse,
    AgentResponse,
    ManagerMessage,
    ManagerMessageSent,
    NewMessage,
    /// Non-JSON text frame
    LegacyText,
    /// Binary frame
    Binary,
    Other(String),
}

impl EventKind {
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "worker_message" => EventKind::WorkerMessage,
            "ai_response" => EventKind::AiResponse,
            "agent_response" => EventKind::AgentResponse,
            "manager_message" => EventKind::ManagerMessage,
            "manager_message_sent" => EventKind::ManagerMessageSent,
            "new_message" => EventKind::NewMessage,
            "legacy_text" => EventKind::LegacyText,
            "binary" => EventKind::Binary,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::WorkerMessage => "worker_message",
            EventKind::AiResponse => "ai_response",
            EventKind::AgentResponse => "agent_response",
            EventKind::ManagerMessage => "manager_message",
            EventKind::ManagerMessageSent => "manager_message_sent",
            EventKind::NewMessage => "new_message",
            EventKind::LegacyText => "legacy_text",
            EventKind::Binary => "binary",
            EventKind::Other(name) => name,
        }
    }

    /// Author role implied by the kind alone
    pub fn implied_role(&self) -> Option<Role> {
        match self {
            EventKind::WorkerMessage | EventKind::NewMessage => Some(Role::Worker),
            EventKind::ManagerMessage | EventKind::ManagerMessageSent => Some(Role::Manager),
            EventKind::AiResponse | EventKind::AgentResponse => Some(Role::Agent),
            _ => None,
        }
    }

    /// Kinds that show up in the manager's live activity feed
    pub fn is_activity(&self) -> bool {
        matches!(
            self,
            EventKind::NewMessage
                | EventKind::WorkerMessage
                | EventKind::AgentResponse
                | EventKind::AiResponse
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound frame, parsed as far as the wire allows
///
/// Parsing never fails: anything that is not a JSON object becomes a
/// `LegacyText` event whose content is the whole text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub content: Option<Value>,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub recipient_id: Option<i64>,
    pub worker_id: Option<i64>,
    pub sender_role: Option<String>,
    pub timestamp: Option<String>,
    pub message_id: Option<i64>,
    pub client_ref: Option<String>,
    /// The frame as received
    pub raw: String,
    pub received_at: DateTime<Utc>,
}

impl RawEvent {
    fn empty(kind: EventKind, raw: String, received_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            content: None,
            sender_id: None,
            sender_name: None,
            recipient_id: None,
            worker_id: None,
            sender_role: None,
            timestamp: None,
            message_id: None,
            client_ref: None,
            raw,
            received_at,
        }
    }

    /// Parse a text frame
    pub fn from_text(text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        let text = text.into();
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(fields)) => Self::from_fields(&fields, text, received_at),
            _ => {
                let mut event = Self::empty(EventKind::LegacyText, text, received_at);
                event.content = Some(Value::String(event.raw.clone()));
                event
            }
        }
    }

    /// Parse a binary frame as lossy UTF-8
    pub fn from_binary(bytes: &[u8], received_at: DateTime<Utc>) -> Self {
        let text = String::from_utf8_lossy(bytes).into_owned();
        let mut event = Self::empty(EventKind::Binary, text, received_at);
        event.content = Some(Value::String(event.raw.clone()));
        event
    }

    fn from_fields(fields: &Map<String, Value>, raw: String, received_at: DateTime<Utc>) -> Self {
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .map(EventKind::from_type)
            .unwrap_or_else(|| EventKind::Other(String::new()));

        Self {
            kind,
            content: fields.get("content").filter(|v| !v.is_null()).cloned(),
            sender_id: int_field(fields, "sender_id"),
            sender_name: str_field(fields, "sender_name"),
            recipient_id: int_field(fields, "recipient_id"),
            worker_id: int_field(fields, "worker_id"),
            sender_role: str_field(fields, "sender_role").or_else(|| str_field(fields, "sender")),
            timestamp: str_field(fields, "timestamp"),
            message_id: int_field(fields, "message_id").or_else(|| int_field(fields, "id")),
            client_ref: str_field(fields, "client_ref"),
            raw,
            received_at,
        }
    }

    /// Worker thread this event belongs to, from a manager's point of view
    pub fn counterparty(&self) -> Option<i64> {
        if self.worker_id.is_some() {
            return self.worker_id;
        }
        match self.kind.implied_role() {
            Some(Role::Worker) => self.sender_id,
            Some(Role::Manager) => self.recipient_id,
            Some(Role::Agent) => self.recipient_id.or(self.sender_id),
            None => None,
        }
    }

    /// Content as display text, if any
    pub fn content_text(&self) -> Option<String> {
        match &self.content {
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

fn int_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A persisted message as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub content: Option<Value>,
    /// Role tag of the author
    #[serde(default)]
    pub sender: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub sender_id: Option<i64>,
}

impl HistoryRecord {
    pub fn sender_tag(&self) -> Option<&str> {
        self.sender.as_ref().and_then(Value::as_str)
    }
}

/// Frame sent over the socket for an outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<i64>,
    pub client_ref: String,
}

impl OutboundFrame {
    pub fn for_identity(
        identity: &SessionIdentity,
        counterparty: Option<i64>,
        content: impl Into<String>,
        client_ref: impl Into<String>,
    ) -> Self {
        let (kind, recipient_id) = match identity.role {
            Role::Worker => ("worker_message", None),
            Role::Manager => ("manager_message", counterparty),
            Role::Agent => ("agent_response", counterparty),
        };
        Self {
            kind: kind.to_string(),
            content: content.into(),
            sender_id: identity.id,
            recipient_id,
            client_ref: client_ref.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Same message in REST form
    pub fn to_send_request(&self) -> SendRequest {
        SendRequest {
            recipient_id: self.recipient_id,
            content: self.content.clone(),
            client_ref: self.client_ref.clone(),
        }
    }
}

/// Body of `POST /messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<i64>,
    pub content: String,
    pub client_ref: String,
}

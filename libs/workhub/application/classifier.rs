//! Message classification
//!
//! Maps a live event or a persisted record to a [`NormalizedMessage`].
//! Classification never fails. In priority order:
//!
//! 1. An explicit role tag (or the role implied by a structured event kind)
//!    is used as-is.
//! 2. Otherwise a recognized legacy prefix (`You:`, `Agent:`, `🤖`,
//!    `Manager:`) is stripped and decides the role.
//! 3. Otherwise the entry is a `System` message whose text is the payload.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::domain::message::parse_timestamp;
use crate::domain::{
    HistoryRecord, MessageId, NormalizedMessage, Origin, RawEvent, Role, SenderRole,
};

const LEGACY_PREFIXES: &[(&str, SenderRole)] = &[
    ("You:", SenderRole::User),
    ("Agent:", SenderRole::Agent),
    ("AI:", SenderRole::Agent),
    ("\u{1F916}", SenderRole::Agent),
    ("Manager:", SenderRole::Manager),
];

/// Input to [`classify`]
#[derive(Debug, Clone, Copy)]
pub enum ClassifierInput<'a> {
    Event(&'a RawEvent),
    /// A history record and the timestamp to use when it has none
    Record(&'a HistoryRecord, DateTime<Utc>),
}

pub fn classify(input: ClassifierInput<'_>) -> NormalizedMessage {
    match input {
        ClassifierInput::Event(event) => classify_event(event),
        ClassifierInput::Record(record, fallback) => classify_record(record, fallback),
    }
}

/// Classify a live event; its timestamp defaults to the receipt time
pub fn classify_event(event: &RawEvent) -> NormalizedMessage {
    let explicit = event
        .sender_role
        .as_deref()
        .and_then(SenderRole::from_tag)
        .or_else(|| event.kind.implied_role().map(role_to_sender));
    let created_at = event
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(event.received_at);

    let (sender_role, content) = resolve(explicit, event.content.as_ref(), &event.raw);
    if sender_role == SenderRole::System {
        debug!("[Sync] Unclassified {} frame kept as system message", event.kind);
    }

    let mut message = NormalizedMessage::new(content, sender_role, created_at, Origin::Live);
    if let Some(id) = event.message_id {
        message.id = MessageId::Stored(id);
    }
    message.client_ref = event.client_ref.clone();
    message.sender_id = event.sender_id;
    message
}

/// Classify a history record; a missing or unparsable `created_at` becomes `fallback`
pub fn classify_record(record: &HistoryRecord, fallback: DateTime<Utc>) -> NormalizedMessage {
    let explicit = record.sender_tag().and_then(SenderRole::from_tag);
    let created_at = record
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(fallback);

    let raw = serde_json::to_string(record).unwrap_or_default();
    let (sender_role, content) = resolve(explicit, record.content.as_ref(), &raw);

    let mut message = NormalizedMessage::new(content, sender_role, created_at, Origin::History);
    if let Some(id) = record.id {
        message.id = MessageId::Stored(id);
    }
    message.sender_id = record.sender_id;
    message
}

/// Classify one page of history in fetch order
///
/// A record without a usable timestamp takes the previous record's, or
/// `fetched_at` when it comes first.
pub fn classify_history(
    records: &[HistoryRecord],
    fetched_at: DateTime<Utc>,
) -> Vec<NormalizedMessage> {
    let mut previous = fetched_at;
    records
        .iter()
        .map(|record| {
            let message = classify_record(record, previous);
            previous = message.created_at;
            message
        })
        .collect()
}

fn resolve(
    explicit: Option<SenderRole>,
    content: Option<&Value>,
    raw: &str,
) -> (SenderRole, String) {
    match (explicit, content) {
        // Rule 1: structured role
        (Some(role), Some(Value::String(text))) => (role, text.clone()),
        (Some(role), Some(value)) => (role, value.to_string()),
        // Rule 2: legacy prefix
        (None, Some(Value::String(text))) => match strip_legacy_prefix(text) {
            Some((role, stripped)) => (role, stripped),
            None => (SenderRole::System, text.clone()),
        },
        // Rule 3: fallback
        (_, Some(value)) => (SenderRole::System, value.to_string()),
        (_, None) => (SenderRole::System, raw.to_string()),
    }
}

/// Strip a recognized legacy role prefix
pub fn strip_legacy_prefix(text: &str) -> Option<(SenderRole, String)> {
    let trimmed = text.trim_start();
    LEGACY_PREFIXES.iter().find_map(|(prefix, role)| {
        trimmed
            .strip_prefix(prefix)
            .map(|rest| (*role, rest.trim_start().to_string()))
    })
}

fn role_to_sender(role: Role) -> SenderRole {
    match role {
        Role::Worker => SenderRole::User,
        Role::Manager => SenderRole::Manager,
        Role::Agent => SenderRole::Agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn event(value: Value) -> RawEvent {
        RawEvent::from_text(value.to_string(), Utc::now())
    }

    #[test]
    fn test_structured_kind_maps_role() {
        let msg = classify_event(&event(json!({
            "type": "manager_message_sent", "content": "On my way", "recipient_id": 7
        })));
        assert_eq!(msg.sender_role, SenderRole::Manager);
        assert_eq!(msg.content, "On my way");
        assert_eq!(msg.origin, Origin::Live);
        assert_eq!(msg.id, MessageId::Unassigned);

        let msg = classify_event(&event(json!({"type": "ai_response", "content": "Checking"})));
        assert_eq!(msg.sender_role, SenderRole::Agent);

        let msg = classify_event(&event(json!({"type": "new_message", "content": "Hi"})));
        assert_eq!(msg.sender_role, SenderRole::User);
    }

    #[test]
    fn test_explicit_role_wins_over_kind() {
        let msg = classify_event(&event(json!({
            "type": "new_message", "content": "Escalated", "sender_role": "agent"
        })));
        assert_eq!(msg.sender_role, SenderRole::Agent);
    }

    #[test]
    fn test_structured_content_keeps_prefix_text() {
        let msg = classify_event(&event(json!({"type": "worker_message", "content": "You: ok"})));
        assert_eq!(msg.sender_role, SenderRole::User);
        assert_eq!(msg.content, "You: ok");
    }

    #[test]
    fn test_legacy_prefixes_are_stripped() {
        let cases = [
            ("You: Need backup", SenderRole::User, "Need backup"),
            ("Agent: Help is coming", SenderRole::Agent, "Help is coming"),
            ("\u{1F916} Checking the schedule", SenderRole::Agent, "Checking the schedule"),
            ("Manager: Stay put", SenderRole::Manager, "Stay put"),
        ];
        for (text, role, content) in cases {
            let msg = classify_event(&RawEvent::from_text(text, Utc::now()));
            assert_eq!(msg.sender_role, role, "{}", text);
            assert_eq!(msg.content, content);
        }
    }

    #[test]
    fn test_unrecognized_payloads_fall_back_to_system() {
        let msg = classify_event(&RawEvent::from_text("server restarting", Utc::now()));
        assert_eq!(msg.sender_role, SenderRole::System);
        assert_eq!(msg.content, "server restarting");

        let msg = classify_event(&event(json!({"type": "roster_update", "workers": [1, 2]})));
        assert_eq!(msg.sender_role, SenderRole::System);
        assert!(msg.content.contains("roster_update"));

        let msg = classify_event(&event(json!({"type": "mystery", "content": {"a": 1}})));
        assert_eq!(msg.sender_role, SenderRole::System);
        assert_eq!(msg.content, r#"{"a":1}"#);

        let msg = classify_event(&RawEvent::from_binary(&[0x68, 0x69, 0xff], Utc::now()));
        assert_eq!(msg.sender_role, SenderRole::System);
        assert!(msg.content.starts_with("hi"));
    }

    #[test]
    fn test_event_timestamp_and_correlation() {
        let received = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let raw = RawEvent::from_text(
            json!({
                "type": "worker_message", "content": "x", "message_id": 42,
                "client_ref": "c-1", "timestamp": "2024-05-01T10:00:00Z"
            })
            .to_string(),
            received,
        );
        let msg = classify(ClassifierInput::Event(&raw));
        assert_eq!(msg.id, MessageId::Stored(42));
        assert_eq!(msg.client_ref.as_deref(), Some("c-1"));
        assert_eq!(msg.created_at, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let raw = RawEvent::from_text(r#"{"type":"worker_message","content":"x"}"#, received);
        assert_eq!(classify_event(&raw).created_at, received);
    }

    #[test]
    fn test_history_record_classification() {
        let fetched = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let record = HistoryRecord {
            id: Some(5),
            content: Some(json!("Shift swap approved")),
            sender: Some(json!("manager")),
            created_at: Some("2024-05-01T08:30:00".to_string()),
            sender_id: Some(1),
        };
        let msg = classify(ClassifierInput::Record(&record, fetched));
        assert_eq!(msg.id, MessageId::Stored(5));
        assert_eq!(msg.sender_role, SenderRole::Manager);
        assert_eq!(msg.origin, Origin::History);
        assert_eq!(msg.created_at, Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());

        let legacy = HistoryRecord {
            id: Some(6),
            content: Some(json!("Agent: Noted")),
            sender: None,
            created_at: None,
            sender_id: None,
        };
        let msg = classify_record(&legacy, fetched);
        assert_eq!(msg.sender_role, SenderRole::Agent);
        assert_eq!(msg.content, "Noted");
        assert_eq!(msg.created_at, fetched);

        let empty = HistoryRecord {
            id: Some(7),
            content: None,
            sender: None,
            created_at: None,
            sender_id: None,
        };
        let msg = classify_record(&empty, fetched);
        assert_eq!(msg.sender_role, SenderRole::System);
        assert!(msg.content.contains("\"id\":7"));
    }

    #[test]
    fn test_history_page_carries_timestamps_forward() {
        let fetched = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let page = vec![
            HistoryRecord {
                id: Some(1),
                content: Some(json!("first")),
                sender: Some(json!("worker")),
                created_at: None,
                sender_id: Some(7),
            },
            HistoryRecord {
                id: Some(2),
                content: Some(json!("second")),
                sender: Some(json!("manager")),
                created_at: Some("2024-05-01T10:00:00Z".to_string()),
                sender_id: Some(1),
            },
            HistoryRecord {
                id: Some(3),
                content: Some(json!("third")),
                sender: Some(json!("agent")),
                created_at: Some("not a date".to_string()),
                sender_id: None,
            },
        ];

        let messages = classify_history(&page, fetched);
        let stamps: Vec<_> = messages.iter().map(|m| m.created_at).collect();
        let ten = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(stamps, vec![fetched, ten, ten]);
    }
}

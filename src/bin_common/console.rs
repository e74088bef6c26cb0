//! Console rendering and command parsing shared by the chat binaries

use parking_lot::Mutex;
use tracing::warn;
use workhub::{NormalizedMessage, Role, SenderRole, StoreError, SyncEventCallback};

/// Tag shown for `role` when the conversation is viewed as `viewer`
fn sender_tag(role: SenderRole, viewer: Role) -> &'static str {
    if role.is_equivalent(viewer.own_sender_role()) {
        return "you";
    }
    match role {
        SenderRole::User | SenderRole::Worker => "worker",
        SenderRole::Manager => "manager",
        SenderRole::Agent => "agent",
        SenderRole::System => "system",
    }
}

/// One conversation line, e.g. `12:04:31 [manager] On my way`
///
/// Unconfirmed messages carry a trailing ellipsis.
pub fn format_message(message: &NormalizedMessage, viewer: Role) -> String {
    let mut line = format!(
        "{} [{}] {}",
        message.created_at.format("%H:%M:%S"),
        sender_tag(message.sender_role, viewer),
        message.content
    );
    if message.is_pending() {
        line.push_str(" …");
    }
    line
}

/// Prints conversation changes to stdout
///
/// Only lines that differ from the previous render are printed, so a
/// confirmed message shows up again without its ellipsis.
pub struct ConsolePrinter {
    viewer: Role,
    rendered: Mutex<Vec<String>>,
}

impl ConsolePrinter {
    pub fn new(viewer: Role) -> Self {
        Self {
            viewer,
            rendered: Mutex::new(Vec::new()),
        }
    }

    /// Lines to print for `messages`, updating the render cache
    pub fn diff(&self, messages: &[NormalizedMessage]) -> Vec<String> {
        let lines: Vec<String> = messages
            .iter()
            .map(|m| format_message(m, self.viewer))
            .collect();
        let mut rendered = self.rendered.lock();
        let shared = rendered
            .iter()
            .zip(&lines)
            .take_while(|(old, new)| old == new)
            .count();
        let mut out = Vec::new();
        if shared < rendered.len() {
            out.push("---".to_string());
        }
        out.extend(lines[shared..].iter().cloned());
        *rendered = lines;
        out
    }
}

impl SyncEventCallback for ConsolePrinter {
    fn on_messages_changed(&self, messages: &[NormalizedMessage]) {
        for line in self.diff(messages) {
            println!("{}", line);
        }
    }

    fn on_unread(&self, counterparty: i64, unread: u32) {
        println!("[unread] worker {}: {} new", counterparty, unread);
    }

    fn on_connectivity_changed(&self, connected: bool) {
        if connected {
            println!("[link] connected");
        } else {
            println!("[link] disconnected, sending paused");
        }
    }

    fn on_history_failed(&self, error: &StoreError) {
        warn!("[Console] Could not load history: {}", error);
        println!("[history] unavailable ({})", error);
    }
}

/// A line typed into the manager console
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// `/open <worker-id>`
    Open(i64),
    /// `/close`
    Close,
    /// `/unread`
    Unread,
    /// `/feed`
    Feed,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Anything that is not a command
    Say(String),
    /// A slash command that could not be understood
    Invalid(String),
}

impl ConsoleCommand {
    /// `None` for blank input
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(ConsoleCommand::Say(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        let parsed = match (name, arg) {
            ("open", Some(id)) => match id.parse() {
                Ok(id) => ConsoleCommand::Open(id),
                Err(_) => ConsoleCommand::Invalid(format!("not a worker id: {}", id)),
            },
            ("open", None) => ConsoleCommand::Invalid("usage: /open <worker-id>".to_string()),
            ("close", _) => ConsoleCommand::Close,
            ("unread", _) => ConsoleCommand::Unread,
            ("feed", _) => ConsoleCommand::Feed,
            ("help", _) => ConsoleCommand::Help,
            ("quit" | "exit", _) => ConsoleCommand::Quit,
            (other, _) => ConsoleCommand::Invalid(format!("unknown command: /{}", other)),
        };
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use workhub::{MessageId, Origin};

    fn message(content: &str, role: SenderRole, origin: Origin) -> NormalizedMessage {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 4, 31).unwrap();
        NormalizedMessage::new(content, role, at, origin).with_id(MessageId::Stored(1))
    }

    #[test]
    fn test_tags_are_relative_to_viewer() {
        let from_worker = message("Need backup", SenderRole::User, Origin::Live);
        let from_manager = message("On my way", SenderRole::Manager, Origin::Live);

        assert_eq!(
            format_message(&from_worker, Role::Worker),
            "12:04:31 [you] Need backup"
        );
        assert_eq!(
            format_message(&from_worker, Role::Manager),
            "12:04:31 [worker] Need backup"
        );
        assert_eq!(
            format_message(&from_manager, Role::Worker),
            "12:04:31 [manager] On my way"
        );
        assert_eq!(
            format_message(&from_manager, Role::Manager),
            "12:04:31 [you] On my way"
        );
    }

    #[test]
    fn test_pending_has_ellipsis() {
        let pending = message("hi", SenderRole::User, Origin::Optimistic);
        assert_eq!(format_message(&pending, Role::Worker), "12:04:31 [you] hi …");

        let system = message("Shift starts", SenderRole::System, Origin::History);
        assert_eq!(
            format_message(&system, Role::Worker),
            "12:04:31 [system] Shift starts"
        );
    }

    #[test]
    fn test_printer_prints_only_changes() {
        let printer = ConsolePrinter::new(Role::Worker);
        let first = message("a", SenderRole::Manager, Origin::History);
        let pending = message("b", SenderRole::User, Origin::Optimistic);

        assert_eq!(printer.diff(&[first.clone()]).len(), 1);
        assert_eq!(
            printer.diff(&[first.clone(), pending.clone()]),
            vec!["12:04:31 [you] b …".to_string()]
        );

        let mut confirmed = pending;
        confirmed.origin = Origin::Live;
        assert_eq!(
            printer.diff(&[first.clone(), confirmed]),
            vec!["---".to_string(), "12:04:31 [you] b".to_string()]
        );

        assert_eq!(printer.diff(&[]), vec!["---".to_string()]);
        assert!(printer.diff(&[]).is_empty());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("   "), None);
        assert_eq!(
            ConsoleCommand::parse("hello there"),
            Some(ConsoleCommand::Say("hello there".to_string()))
        );
        assert_eq!(ConsoleCommand::parse("/open 12"), Some(ConsoleCommand::Open(12)));
        assert_eq!(ConsoleCommand::parse("/close"), Some(ConsoleCommand::Close));
        assert_eq!(ConsoleCommand::parse("/unread"), Some(ConsoleCommand::Unread));
        assert_eq!(ConsoleCommand::parse("/feed"), Some(ConsoleCommand::Feed));
        assert_eq!(ConsoleCommand::parse("/quit"), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("/exit"), Some(ConsoleCommand::Quit));
        assert!(matches!(
            ConsoleCommand::parse("/open abc"),
            Some(ConsoleCommand::Invalid(_))
        ));
        assert!(matches!(
            ConsoleCommand::parse("/open"),
            Some(ConsoleCommand::Invalid(_))
        ));
        assert!(matches!(
            ConsoleCommand::parse("/dance"),
            Some(ConsoleCommand::Invalid(_))
        ));
    }
}

//! Session identity and conversation keys

use serde::{Deserialize, Serialize};
use std::fmt;

use super::message::SenderRole;

/// Role a session authenticates as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Manager,
    Agent,
}

impl Role {
    /// Path segment used by the socket endpoint
    pub fn path_segment(self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Manager => "manager",
            Role::Agent => "agent",
        }
    }

    /// Sender role of messages this session authors
    pub fn own_sender_role(self) -> SenderRole {
        match self {
            Role::Worker => SenderRole::User,
            Role::Manager => SenderRole::Manager,
            Role::Agent => SenderRole::Agent,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// The authenticated user for the lifetime of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionIdentity {
    pub id: i64,
    pub role: Role,
}

impl SessionIdentity {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn worker(id: i64) -> Self {
        Self::new(id, Role::Worker)
    }

    pub fn manager(id: i64) -> Self {
        Self::new(id, Role::Manager)
    }

    /// Socket endpoint for this identity: `{base}/{role}/{id}`
    pub fn endpoint(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.role.path_segment(),
            self.id
        )
    }

    /// History scope when viewing `counterparty`
    ///
    /// Workers always read their own thread. Managers read the thread with
    /// the selected worker, or their own messages when nothing is selected.
    pub fn history_scope(&self, counterparty: Option<i64>) -> HistoryScope {
        match (self.role, counterparty) {
            (Role::Manager, Some(id)) => HistoryScope::Counterparty(id),
            _ => HistoryScope::Own,
        }
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.role, self.id)
    }
}

/// Selects which message sequence is displayed
///
/// The worker view has no explicit counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub identity: SessionIdentity,
    pub counterparty: Option<i64>,
}

impl ConversationKey {
    pub fn new(identity: SessionIdentity, counterparty: Option<i64>) -> Self {
        Self {
            identity,
            counterparty,
        }
    }

    pub fn scope(&self) -> HistoryScope {
        self.identity.history_scope(self.counterparty)
    }
}

/// What a history fetch covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryScope {
    /// All messages for the current user
    Own,
    /// Messages exchanged with one counterparty
    Counterparty(i64),
}

//! Reconciliation store
//!
//! The ordered log shown to the user. Visible order is always
//! `[history in fetch order..., live and optimistic in arrival order...]`
//! and is never re-sorted by timestamp.
//!
//! Optimistic entries are matched against incoming events by client
//! reference when the echo carries one, otherwise by role equivalence and
//! content equality, earliest-created first. Each optimistic entry is
//! promoted or rolled back exactly once.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::domain::{MessageId, NormalizedMessage, Origin, SenderRole};

/// Handle to an optimistic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptimisticHandle(u64);

impl OptimisticHandle {
    pub fn local_id(&self) -> u64 {
        self.0
    }
}

/// What `reconcile_or_promote` did with an incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A pending entry was confirmed in place
    Promoted {
        handle: OptimisticHandle,
        id: MessageId,
    },
    /// The echo's stored id was already in history; the pending entry
    /// it confirms was removed
    ConfirmedByHistory {
        handle: OptimisticHandle,
        id: MessageId,
    },
    /// Appended as a new live entry
    Appended(MessageId),
    /// Stored id already visible; nothing changed
    Duplicate(MessageId),
}

#[derive(Debug)]
struct PendingEntry {
    handle: OptimisticHandle,
    content: String,
    client_ref: String,
    created: Instant,
}

pub struct ReconciliationStore {
    own_role: SenderRole,
    ref_prefix: String,
    history: Vec<NormalizedMessage>,
    tail: Vec<NormalizedMessage>,
    /// In creation order
    pending: Vec<PendingEntry>,
    next_local_id: u64,
}

impl ReconciliationStore {
    /// Create a store whose optimistic entries are authored as `own_role`
    pub fn new(own_role: SenderRole) -> Self {
        Self {
            own_role,
            ref_prefix: "c-".to_string(),
            history: Vec::new(),
            tail: Vec::new(),
            pending: Vec::new(),
            next_local_id: 1,
        }
    }

    /// Prefix for generated client references
    pub fn with_ref_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ref_prefix = prefix.into();
        self
    }

    pub fn own_role(&self) -> SenderRole {
        self.own_role
    }

    fn allocate_local(&mut self) -> u64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }

    /// Replace the history partition
    ///
    /// Records whose stored id is already in the live partition are skipped,
    /// and a timestamp earlier than the previous record's is clamped to it.
    /// Returns the number of records kept.
    pub fn seed_history(&mut self, records: Vec<NormalizedMessage>) -> usize {
        let live_ids: HashSet<i64> = self.tail.iter().filter_map(|m| m.id.stored()).collect();
        let mut seen = HashSet::new();
        let mut previous: Option<DateTime<Utc>> = None;
        let mut history = Vec::with_capacity(records.len());

        for mut record in records {
            if let Some(id) = record.id.stored() {
                if live_ids.contains(&id) || !seen.insert(id) {
                    debug!("[Store] Skipping duplicate history record {}", id);
                    continue;
                }
            } else {
                record.id = MessageId::Local(self.allocate_local());
            }

            if let Some(floor) = previous {
                if record.created_at < floor {
                    record.created_at = floor;
                }
            }
            previous = Some(record.created_at);
            record.origin = Origin::History;
            history.push(record);
        }

        let kept = history.len();
        self.history = history;
        info!("[Store] Seeded {} history messages", kept);
        kept
    }

    /// Append an optimistic entry authored by this session
    pub fn append_optimistic(&mut self, content: impl Into<String>) -> OptimisticHandle {
        self.append_optimistic_at(content, Instant::now())
    }

    pub fn append_optimistic_at(
        &mut self,
        content: impl Into<String>,
        created: Instant,
    ) -> OptimisticHandle {
        let content = content.into();
        let local = self.allocate_local();
        let handle = OptimisticHandle(local);
        let client_ref = format!("{}{}", self.ref_prefix, local);

        let message = NormalizedMessage::new(
            content.clone(),
            self.own_role,
            Utc::now(),
            Origin::Optimistic,
        )
        .with_id(MessageId::Local(local))
        .with_client_ref(client_ref.clone());

        self.tail.push(message);
        self.pending.push(PendingEntry {
            handle,
            content,
            client_ref,
            created,
        });
        debug!("[Store] Optimistic entry {} appended", local);
        handle
    }

    /// Client reference generated for a pending entry
    pub fn client_ref(&self, handle: OptimisticHandle) -> Option<&str> {
        self.pending
            .iter()
            .find(|p| p.handle == handle)
            .map(|p| p.client_ref.as_str())
    }

    pub fn is_pending(&self, handle: OptimisticHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Promote the matching pending entry, or append `incoming` as live
    pub fn reconcile_or_promote(&mut self, mut incoming: NormalizedMessage) -> ReconcileOutcome {
        if let Some(id) = incoming.id.stored() {
            let stored = MessageId::Stored(id);
            if self.history.iter().any(|m| m.id == stored) {
                // History fetched after a send may already hold its persisted copy
                if let Some(index) = self.find_pending(&incoming) {
                    let entry = self.pending.remove(index);
                    return self.confirm_by_history(entry, stored);
                }
                debug!("[Store] Duplicate message {} ignored", id);
                return ReconcileOutcome::Duplicate(stored);
            }
            if self.tail.iter().any(|m| m.id == stored) {
                debug!("[Store] Duplicate message {} ignored", id);
                return ReconcileOutcome::Duplicate(stored);
            }
        }

        if let Some(index) = self.find_pending(&incoming) {
            let entry = self.pending.remove(index);
            return self.promote(entry, incoming);
        }

        if incoming.id == MessageId::Unassigned {
            incoming.id = MessageId::Local(self.allocate_local());
        }
        incoming.origin = Origin::Live;
        let id = incoming.id;
        self.tail.push(incoming);
        ReconcileOutcome::Appended(id)
    }

    fn find_pending(&self, incoming: &NormalizedMessage) -> Option<usize> {
        if let Some(client_ref) = incoming.client_ref.as_deref() {
            // A reference we did not issue belongs to someone else's send
            return self.pending.iter().position(|p| p.client_ref == client_ref);
        }
        if !incoming.sender_role.is_equivalent(self.own_role) {
            return None;
        }
        self.pending
            .iter()
            .position(|p| p.content == incoming.content)
    }

    fn promote(&mut self, entry: PendingEntry, incoming: NormalizedMessage) -> ReconcileOutcome {
        let local = MessageId::Local(entry.handle.0);
        let id = match incoming.id {
            MessageId::Stored(_) => incoming.id,
            _ => local,
        };

        if let Some(message) = self.tail.iter_mut().find(|m| m.id == local) {
            message.id = id;
            message.created_at = incoming.created_at;
            message.origin = Origin::Live;
            if message.sender_id.is_none() {
                message.sender_id = incoming.sender_id;
            }
        }
        debug!("[Store] Optimistic entry {} confirmed as {}", entry.handle.0, id);
        ReconcileOutcome::Promoted {
            handle: entry.handle,
            id,
        }
    }

    fn confirm_by_history(&mut self, entry: PendingEntry, id: MessageId) -> ReconcileOutcome {
        let local = MessageId::Local(entry.handle.0);
        self.tail.retain(|m| m.id != local);
        debug!(
            "[Store] Optimistic entry {} already in history as {}",
            entry.handle.0, id
        );
        ReconcileOutcome::ConfirmedByHistory {
            handle: entry.handle,
            id,
        }
    }

    /// Remove a pending entry; false if it was already promoted or removed
    pub fn rollback(&mut self, handle: OptimisticHandle) -> bool {
        let Some(index) = self.pending.iter().position(|p| p.handle == handle) else {
            return false;
        };
        self.pending.remove(index);
        let local = MessageId::Local(handle.0);
        self.tail.retain(|m| m.id != local);
        info!("[Store] Optimistic entry {} rolled back", handle.0);
        true
    }

    /// Roll back pending entries created more than `ttl` before `now`
    pub fn expire_pending(&mut self, now: Instant, ttl: Duration) -> Vec<OptimisticHandle> {
        let expired: Vec<OptimisticHandle> = self
            .pending
            .iter()
            .filter(|p| now.saturating_duration_since(p.created) > ttl)
            .map(|p| p.handle)
            .collect();
        for handle in &expired {
            self.rollback(*handle);
        }
        expired
    }

    /// Empty every partition
    pub fn clear(&mut self) {
        self.history.clear();
        self.tail.clear();
        self.pending.clear();
    }

    pub fn visible(&self) -> impl Iterator<Item = &NormalizedMessage> {
        self.history.iter().chain(self.tail.iter())
    }

    pub fn snapshot(&self) -> Vec<NormalizedMessage> {
        self.visible().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.history.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

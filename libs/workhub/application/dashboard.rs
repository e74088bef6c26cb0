//! Session-scoped dashboard state
//!
//! One explicit object for the counters and flags the dashboard panels
//! read: connectivity, unread counts per worker, the live activity feed and
//! the incident counter. Only the sync controller mutates it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::domain::{EventKind, RawEvent};

/// Shared handle to the dashboard state
pub type SharedDashboardState = Arc<RwLock<DashboardState>>;

/// One line of the activity feed
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub kind: EventKind,
    pub content: String,
    pub sender_id: Option<i64>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    connected: bool,
    unread: HashMap<i64, u32>,
    /// Newest first
    activity: VecDeque<ActivityEntry>,
    activity_limit: usize,
    incidents: u32,
}

impl DashboardState {
    pub fn new(activity_limit: usize) -> Self {
        Self {
            connected: false,
            unread: HashMap::new(),
            activity: VecDeque::with_capacity(activity_limit),
            activity_limit,
            incidents: 0,
        }
    }

    pub fn shared(activity_limit: usize) -> SharedDashboardState {
        Arc::new(RwLock::new(Self::new(activity_limit)))
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Bump the unread counter for `counterparty`, returning the new count
    pub fn increment_unread(&mut self, counterparty: i64) -> u32 {
        let count = self.unread.entry(counterparty).or_insert(0);
        *count += 1;
        *count
    }

    pub fn mark_read(&mut self, counterparty: i64) {
        self.unread.remove(&counterparty);
    }

    pub fn unread(&self, counterparty: i64) -> u32 {
        self.unread.get(&counterparty).copied().unwrap_or(0)
    }

    pub fn total_unread(&self) -> u32 {
        self.unread.values().sum()
    }

    /// Unread counters sorted by counterparty
    pub fn unread_counts(&self) -> Vec<(i64, u32)> {
        let mut counts: Vec<(i64, u32)> = self.unread.iter().map(|(k, v)| (*k, *v)).collect();
        counts.sort_unstable();
        counts
    }

    /// Record an activity event; returns false for kinds the feed ignores
    pub fn record_activity(&mut self, event: &RawEvent) -> bool {
        if !event.kind.is_activity() {
            return false;
        }
        let content = event.content_text().unwrap_or_default();
        if content.to_lowercase().contains("incident") {
            self.incidents += 1;
        }

        self.activity.push_front(ActivityEntry {
            kind: event.kind.clone(),
            content,
            sender_id: event.sender_id,
            received_at: event.received_at,
        });
        self.activity.truncate(self.activity_limit);
        true
    }

    pub fn activity(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.activity.iter()
    }

    pub fn activity_len(&self) -> usize {
        self.activity.len()
    }

    pub fn incidents(&self) -> u32 {
        self.incidents
    }

    /// Forget everything (logout or identity change)
    pub fn reset(&mut self) {
        self.connected = false;
        self.unread.clear();
        self.activity.clear();
        self.incidents = 0;
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(50)
    }
}

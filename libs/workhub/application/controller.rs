//! Session-scoped sync controller
//!
//! Wires the classifier, the reconciliation store and the dashboard state
//! together for one session identity. It performs no I/O: history fetches
//! are requested through [`HistoryRequest`] values, transmissions go through
//! a [`Transport`], and REST deliveries are queued in an outbox the session
//! driver drains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::classifier::{classify_event, classify_history};
use super::dashboard::SharedDashboardState;
use super::store::{OptimisticHandle, ReconcileOutcome, ReconciliationStore};
use super::traits::{DeliveryTicket, Result, SyncEventCallback, Transport};
use crate::domain::{
    ConversationKey, HistoryRecord, HistoryScope, NormalizedMessage, OutboundFrame, RawEvent,
    Role, SendRequest, SessionIdentity,
};

/// How outgoing messages reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Over the live connection
    #[default]
    Socket,
    /// Through the REST message store; the socket echo confirms
    Rest,
}

/// History fetch the driver should start for an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub generation: u64,
    pub scope: HistoryScope,
}

/// Queued REST delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedDelivery {
    pub generation: u64,
    pub handle: OptimisticHandle,
    pub request: SendRequest,
}

/// Where an inbound frame ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRoute {
    Displayed(ReconcileOutcome),
    /// Belongs to another conversation
    Unread { counterparty: i64, count: u32 },
    /// Own echo for a conversation that is no longer displayed
    Skipped,
}

pub struct SyncController {
    identity: SessionIdentity,
    counterparty: Option<i64>,
    store: ReconciliationStore,
    dashboard: SharedDashboardState,
    callback: Arc<dyn SyncEventCallback>,
    delivery: DeliveryMode,
    pending_ttl: Duration,
    generation: u64,
    history_pending: bool,
    in_flight: HashMap<DeliveryTicket, OptimisticHandle>,
    outbox: Vec<QueuedDelivery>,
}

impl SyncController {
    pub fn new(
        identity: SessionIdentity,
        dashboard: SharedDashboardState,
        callback: Arc<dyn SyncEventCallback>,
    ) -> Self {
        Self {
            identity,
            counterparty: None,
            store: Self::store_for(&identity),
            dashboard,
            callback,
            delivery: DeliveryMode::Socket,
            pending_ttl: Duration::from_secs(10),
            generation: 0,
            history_pending: false,
            in_flight: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    fn store_for(identity: &SessionIdentity) -> ReconciliationStore {
        let prefix = format!(
            "{}{}-{}-",
            identity.role,
            identity.id,
            Utc::now().timestamp_millis()
        );
        ReconciliationStore::new(identity.role.own_sender_role()).with_ref_prefix(prefix)
    }

    pub fn identity(&self) -> SessionIdentity {
        self.identity
    }

    pub fn conversation(&self) -> ConversationKey {
        ConversationKey::new(self.identity, self.counterparty)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_history_pending(&self) -> bool {
        self.history_pending
    }

    pub fn store(&self) -> &ReconciliationStore {
        &self.store
    }

    pub fn messages(&self) -> Vec<NormalizedMessage> {
        self.store.snapshot()
    }

    pub fn dashboard(&self) -> SharedDashboardState {
        Arc::clone(&self.dashboard)
    }

    fn notify_messages(&self) {
        let snapshot = self.store.snapshot();
        self.callback.on_messages_changed(&snapshot);
    }

    /// Display the conversation with `counterparty`
    ///
    /// Clears the visible sequence and invalidates any history response
    /// still in flight. The connection is left alone.
    pub fn activate(&mut self, counterparty: Option<i64>) -> HistoryRequest {
        self.store.clear();
        self.in_flight.clear();
        self.outbox.clear();
        self.counterparty = counterparty;
        self.generation += 1;
        self.history_pending = true;

        if let Some(id) = counterparty {
            self.dashboard.write().mark_read(id);
        }
        info!(
            "[Sync] {} activated conversation {:?} (generation {})",
            self.identity, counterparty, self.generation
        );
        self.notify_messages();

        HistoryRequest {
            generation: self.generation,
            scope: self.conversation().scope(),
        }
    }

    /// Apply a history response; stale generations are discarded
    pub fn apply_history(
        &mut self,
        generation: u64,
        result: Result<Vec<HistoryRecord>>,
        fetched_at: DateTime<Utc>,
    ) -> bool {
        if generation != self.generation || !self.history_pending {
            debug!(
                "[History] Discarding response for generation {} (current {})",
                generation, self.generation
            );
            return false;
        }
        self.history_pending = false;

        match result {
            Ok(records) => {
                let messages = classify_history(&records, fetched_at);
                let kept = self.store.seed_history(messages);
                info!("[History] Loaded {} of {} records", kept, records.len());
                self.notify_messages();
            }
            Err(e) => {
                warn!("[History] Fetch failed: {}", e);
                self.callback.on_history_failed(&e);
            }
        }
        true
    }

    /// Route one inbound frame
    pub fn handle_frame(&mut self, event: RawEvent) -> FrameRoute {
        self.dashboard.write().record_activity(&event);
        let message = classify_event(&event);

        if self.identity.role == Role::Manager {
            if let Some(other) = event.counterparty().filter(|c| Some(*c) != self.counterparty) {
                if message.sender_role.is_equivalent(self.store.own_role()) {
                    debug!("[Sync] Own echo for inactive conversation {}", other);
                    return FrameRoute::Skipped;
                }
                let count = self.dashboard.write().increment_unread(other);
                debug!("[Sync] Unread for {} is now {}", other, count);
                self.callback.on_unread(other, count);
                return FrameRoute::Unread {
                    counterparty: other,
                    count,
                };
            }
        }

        let outcome = self.store.reconcile_or_promote(message);
        if let ReconcileOutcome::Promoted { handle, .. }
        | ReconcileOutcome::ConfirmedByHistory { handle, .. } = &outcome
        {
            let handle = *handle;
            self.in_flight.retain(|_, h| *h != handle);
        }
        if !matches!(outcome, ReconcileOutcome::Duplicate(_)) {
            self.notify_messages();
        }
        FrameRoute::Displayed(outcome)
    }

    /// Mirror the connection state; pending entries are left alone
    pub fn set_connected(&mut self, connected: bool) {
        let changed = {
            let mut dashboard = self.dashboard.write();
            let changed = dashboard.is_connected() != connected;
            dashboard.set_connected(connected);
            changed
        };
        if changed {
            info!("[Sync] Connectivity changed: connected={}", connected);
            self.callback.on_connectivity_changed(connected);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.dashboard.read().is_connected()
    }

    /// Send `content` in the active conversation
    ///
    /// Refused (returns `None`, nothing appended) while the transport is not
    /// connected, for blank content, and for a manager with no worker selected.
    pub fn send(
        &mut self,
        content: impl Into<String>,
        transport: &dyn Transport,
    ) -> Option<OptimisticHandle> {
        let content = content.into();
        if !transport.is_connected() {
            info!("[Sync] Not connected, message not sent");
            return None;
        }
        if content.trim().is_empty() {
            return None;
        }
        if self.identity.role != Role::Worker && self.counterparty.is_none() {
            warn!("[Sync] No conversation selected, message not sent");
            return None;
        }

        let handle = self.store.append_optimistic(content.clone());
        let client_ref = self.store.client_ref(handle).unwrap_or_default().to_string();
        let frame = OutboundFrame::for_identity(&self.identity, self.counterparty, content, client_ref);

        match self.delivery {
            DeliveryMode::Socket => match transport.transmit(&frame) {
                Some(ticket) => {
                    self.in_flight.insert(ticket, handle);
                }
                None => {
                    self.store.rollback(handle);
                    return None;
                }
            },
            DeliveryMode::Rest => self.outbox.push(QueuedDelivery {
                generation: self.generation,
                handle,
                request: frame.to_send_request(),
            }),
        }
        self.notify_messages();
        Some(handle)
    }

    /// Drain REST deliveries queued by `send`
    pub fn take_outbox(&mut self) -> Vec<QueuedDelivery> {
        std::mem::take(&mut self.outbox)
    }

    /// The transport could not write a frame
    pub fn handle_send_failure(&mut self, ticket: DeliveryTicket) -> bool {
        let Some(handle) = self.in_flight.remove(&ticket) else {
            return false;
        };
        self.rollback(handle)
    }

    /// A REST delivery failed
    pub fn handle_delivery_failure(&mut self, generation: u64, handle: OptimisticHandle) -> bool {
        if generation != self.generation {
            return false;
        }
        self.rollback(handle)
    }

    fn rollback(&mut self, handle: OptimisticHandle) -> bool {
        let removed = self.store.rollback(handle);
        if removed {
            warn!("[Sync] Send failed, entry {} rolled back", handle.local_id());
            self.notify_messages();
        }
        removed
    }

    /// Roll back entries whose echo never arrived
    pub fn expire_pending(&mut self, now: Instant) -> usize {
        let expired = self.store.expire_pending(now, self.pending_ttl);
        if expired.is_empty() {
            return 0;
        }
        warn!("[Sync] {} pending messages expired without confirmation", expired.len());
        self.in_flight.retain(|_, h| !expired.contains(h));
        self.notify_messages();
        expired.len()
    }

    /// Drop all session state
    pub fn logout(&mut self) {
        self.store.clear();
        self.in_flight.clear();
        self.outbox.clear();
        self.counterparty = None;
        self.generation += 1;
        self.history_pending = false;
        self.dashboard.write().reset();
        info!("[Sync] {} logged out", self.identity);
        self.notify_messages();
    }

    /// Switch to a new identity; the caller re-activates afterwards
    pub fn change_identity(&mut self, identity: SessionIdentity) {
        self.logout();
        self.identity = identity;
        self.store = Self::store_for(&identity);
    }
}

//! Session driver
//!
//! One tokio task per session owns the [`SyncController`] and the
//! connection. Every input (UI commands, connection events, history
//! completions, REST delivery failures, the pending-expiry tick) is
//! processed by that task one at a time, in arrival order.

use chrono::{DateTime, Utc};
use livelink::{ConnectionManager, ConnectionState, ExponentialBackoff, SendTicket, WsMessage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::controller::{DeliveryMode, HistoryRequest, SyncController};
use super::dashboard::{DashboardState, SharedDashboardState};
use super::store::OptimisticHandle;
use super::traits::{DeliveryTicket, MessageStore, Result, SyncEventCallback};
use crate::domain::{HistoryRecord, NormalizedMessage, RawEvent, SessionIdentity};

/// Runtime settings for a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Socket base URL; the endpoint is `{ws_base_url}/{role}/{id}`
    pub ws_base_url: String,
    pub token: Option<String>,
    pub reconnect: ExponentialBackoff,
    pub delivery: DeliveryMode,
    pub pending_ttl: Duration,
    pub activity_feed_limit: usize,
    /// Conversation displayed on start
    pub initial_counterparty: Option<i64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://localhost:8000/ws".to_string(),
            token: None,
            reconnect: ExponentialBackoff::conservative(),
            delivery: DeliveryMode::Socket,
            pending_ttl: Duration::from_secs(10),
            activity_feed_limit: 50,
            initial_counterparty: None,
        }
    }
}

/// Commands accepted by a running session
#[derive(Debug)]
pub enum SessionCommand {
    Send {
        content: String,
        reply: oneshot::Sender<Option<OptimisticHandle>>,
    },
    SwitchConversation(Option<i64>),
    ChangeIdentity(SessionIdentity),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Logout,
}

/// Point-in-time view of a session
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub identity: SessionIdentity,
    pub counterparty: Option<i64>,
    pub connected: bool,
    pub messages: Vec<NormalizedMessage>,
    pub pending: usize,
    pub history_pending: bool,
}

enum LinkEvent {
    Frame(WsMessage),
    State(ConnectionState),
    SendFailed(SendTicket),
}

/// Link events carry the id of the connection that produced them
struct TaggedLinkEvent {
    link: u64,
    event: LinkEvent,
}

struct HistoryDone {
    generation: u64,
    result: Result<Vec<HistoryRecord>>,
    fetched_at: DateTime<Utc>,
}

struct DeliveryFailed {
    generation: u64,
    handle: OptimisticHandle,
}

/// Handle to a running session
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    dashboard: SharedDashboardState,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Send `content` in the active conversation
    ///
    /// `None` means nothing was sent (disconnected, blank, or no conversation).
    pub async fn send(&self, content: impl Into<String>) -> Option<OptimisticHandle> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Send {
                content: content.into(),
                reply,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    pub fn switch_conversation(&self, counterparty: Option<i64>) -> bool {
        self.commands
            .send(SessionCommand::SwitchConversation(counterparty))
            .is_ok()
    }

    pub fn change_identity(&self, identity: SessionIdentity) -> bool {
        self.commands
            .send(SessionCommand::ChangeIdentity(identity))
            .is_ok()
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(SessionCommand::Snapshot(reply)).ok()?;
        rx.await.ok()
    }

    pub fn dashboard(&self) -> SharedDashboardState {
        Arc::clone(&self.dashboard)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Clear everything, close the connection and wait for the task to end
    pub async fn logout(self) {
        let _ = self.commands.send(SessionCommand::Logout);
        let _ = self.task.await;
    }
}

pub struct SyncSession;

impl SyncSession {
    /// Spawn the session task; must be called within a tokio runtime
    pub fn start(
        identity: SessionIdentity,
        settings: SessionSettings,
        store: Arc<dyn MessageStore>,
        callback: Arc<dyn SyncEventCallback>,
    ) -> SessionHandle {
        let dashboard = DashboardState::shared(settings.activity_feed_limit);
        let controller = SyncController::new(identity, Arc::clone(&dashboard), callback)
            .with_delivery(settings.delivery)
            .with_pending_ttl(settings.pending_ttl);

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (history_tx, history_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();

        let driver = SessionDriver {
            link: build_link(&settings),
            settings,
            store,
            controller,
            link_id: 0,
            link_tx,
            history_tx,
            delivery_tx,
            history_task: None,
        };
        let task = tokio::spawn(driver.run(command_rx, link_rx, history_rx, delivery_rx));

        SessionHandle {
            commands,
            dashboard,
            task,
        }
    }
}

fn build_link(settings: &SessionSettings) -> ConnectionManager {
    let builder = ConnectionManager::builder().reconnect_strategy(settings.reconnect.clone());
    match &settings.token {
        Some(token) => builder.bearer_token(token.clone()).build(),
        None => builder.build(),
    }
}

struct SessionDriver {
    settings: SessionSettings,
    store: Arc<dyn MessageStore>,
    controller: SyncController,
    link: ConnectionManager,
    link_id: u64,
    link_tx: mpsc::UnboundedSender<TaggedLinkEvent>,
    history_tx: mpsc::UnboundedSender<HistoryDone>,
    delivery_tx: mpsc::UnboundedSender<DeliveryFailed>,
    history_task: Option<JoinHandle<()>>,
}

impl SessionDriver {
    async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        mut link_rx: mpsc::UnboundedReceiver<TaggedLinkEvent>,
        mut history_rx: mpsc::UnboundedReceiver<HistoryDone>,
        mut delivery_rx: mpsc::UnboundedReceiver<DeliveryFailed>,
    ) {
        let request = self.controller.activate(self.settings.initial_counterparty);
        self.spawn_history(request);
        self.open_link();

        let period = (self.settings.pending_ttl / 4).max(Duration::from_millis(100));
        let mut expiry = tokio::time::interval(period);
        expiry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Connection events take priority over commands
                biased;

                Some(tagged) = link_rx.recv() => {
                    if tagged.link == self.link_id {
                        self.handle_link_event(tagged.event);
                    }
                }
                Some(done) = history_rx.recv() => {
                    self.controller.apply_history(done.generation, done.result, done.fetched_at);
                }
                Some(failed) = delivery_rx.recv() => {
                    self.controller.handle_delivery_failure(failed.generation, failed.handle);
                }
                command = command_rx.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                _ = expiry.tick() => {
                    self.controller.expire_pending(Instant::now());
                }
            }
        }

        self.abort_history();
        self.controller.logout();
        self.link.shutdown().await;
        info!("[Sync] Session ended");
    }

    /// Returns false when the session should end
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Send { content, reply } => {
                let handle = self.controller.send(content, &self.link);
                self.flush_outbox();
                let _ = reply.send(handle);
            }
            SessionCommand::SwitchConversation(counterparty) => {
                let request = self.controller.activate(counterparty);
                self.spawn_history(request);
            }
            SessionCommand::ChangeIdentity(identity) => {
                info!("[Sync] Identity change to {}", identity);
                self.abort_history();
                self.link.shutdown().await;
                self.controller.change_identity(identity);
                self.link = build_link(&self.settings);
                self.link_id += 1;
                let request = self.controller.activate(None);
                self.spawn_history(request);
                self.open_link();
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(SessionSnapshot {
                    identity: self.controller.identity(),
                    counterparty: self.controller.conversation().counterparty,
                    connected: self.controller.is_connected(),
                    messages: self.controller.messages(),
                    pending: self.controller.store().pending_count(),
                    history_pending: self.controller.is_history_pending(),
                });
            }
            SessionCommand::Logout => return false,
        }
        true
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Frame(frame) => {
                let received_at = Utc::now();
                let event = match &frame {
                    WsMessage::Text(text) => RawEvent::from_text(text.clone(), received_at),
                    WsMessage::Binary(bytes) => RawEvent::from_binary(bytes, received_at),
                };
                debug!("[Sync] Inbound {} frame", event.kind);
                self.controller.handle_frame(event);
            }
            LinkEvent::State(state) => {
                self.controller.set_connected(state == ConnectionState::Connected);
            }
            LinkEvent::SendFailed(ticket) => {
                self.controller.handle_send_failure(DeliveryTicket(ticket.id()));
            }
        }
    }

    fn open_link(&self) {
        let id = self.link_id;
        let tx = self.link_tx.clone();
        self.link.on_message(move |frame| {
            let _ = tx.send(TaggedLinkEvent {
                link: id,
                event: LinkEvent::Frame(frame.clone()),
            });
        });
        let tx = self.link_tx.clone();
        self.link.on_state_change(move |state| {
            let _ = tx.send(TaggedLinkEvent {
                link: id,
                event: LinkEvent::State(state),
            });
        });
        let tx = self.link_tx.clone();
        self.link.on_send_failure(move |ticket| {
            let _ = tx.send(TaggedLinkEvent {
                link: id,
                event: LinkEvent::SendFailed(ticket),
            });
        });

        let endpoint = self.controller.identity().endpoint(&self.settings.ws_base_url);
        self.link.open(endpoint);
    }

    fn spawn_history(&mut self, request: HistoryRequest) {
        self.abort_history();
        let store = Arc::clone(&self.store);
        let tx = self.history_tx.clone();
        self.history_task = Some(tokio::spawn(async move {
            let result = store.fetch_history(request.scope).await;
            let _ = tx.send(HistoryDone {
                generation: request.generation,
                result,
                fetched_at: Utc::now(),
            });
        }));
    }

    fn abort_history(&mut self) {
        if let Some(task) = self.history_task.take() {
            task.abort();
        }
    }

    fn flush_outbox(&mut self) {
        for queued in self.controller.take_outbox() {
            let store = Arc::clone(&self.store);
            let tx = self.delivery_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = store.send_message(&queued.request).await {
                    debug!("[Sync] REST delivery failed: {}", e);
                    let _ = tx.send(DeliveryFailed {
                        generation: queued.generation,
                        handle: queued.handle,
                    });
                }
            });
        }
    }
}

use crate::core::builder::ConnectionManagerBuilder;
use crate::core::config::ConnectionConfig;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
use crate::traits::*;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{http, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

type FrameObserver = Arc<dyn Fn(&WsMessage) + Send + Sync>;
type StateObserver = Arc<dyn Fn(ConnectionState) + Send + Sync>;
type FailureObserver = Arc<dyn Fn(SendTicket) + Send + Sync>;

/// Identifies one accepted `send`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendTicket(u64);

impl SendTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Commands from the handle to the I/O task
#[derive(Debug)]
enum ClientCommand {
    Send(SendTicket, WsMessage),
    Close,
}

/// Why a live connection ended
enum LinkExit {
    /// `close()` was requested
    Closed,
    /// Transport failure; eligible for reconnection
    Dropped(LinkError),
}

/// State shared by the handle and the I/O task
struct Shared {
    state: AtomicConnectionState,
    metrics: AtomicMetrics,
    /// Bumped by every `open()` and `close()`; frames from an older epoch are discarded
    epoch: AtomicU64,
    /// Serialises observer invocation
    gate: ReentrantMutex<()>,
    frame_observers: RwLock<Vec<FrameObserver>>,
    state_observers: RwLock<Vec<StateObserver>>,
    failure_observers: RwLock<Vec<FailureObserver>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicConnectionState::new(ConnectionState::Disconnected),
            metrics: AtomicMetrics::new(),
            epoch: AtomicU64::new(0),
            gate: ReentrantMutex::new(()),
            frame_observers: RwLock::new(Vec::new()),
            state_observers: RwLock::new(Vec::new()),
            failure_observers: RwLock::new(Vec::new()),
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == epoch
    }

    /// Apply a transition and notify observers; invalid edges are ignored
    fn transition(&self, next: ConnectionState) -> bool {
        let _gate = self.gate.lock();
        match self.state.transition(next) {
            Ok(previous) => {
                debug!("[Link] {} -> {}", previous, next);
                let observers = self.state_observers.read().clone();
                for observer in observers {
                    observer(next);
                }
                true
            }
            Err(err) => {
                debug!("[Link] Ignoring {}", err);
                false
            }
        }
    }

    fn deliver(&self, epoch: u64, message: &WsMessage) {
        let _gate = self.gate.lock();
        if !self.is_current(epoch) {
            debug!("[Link] Discarding frame received after close");
            return;
        }
        let observers = self.frame_observers.read().clone();
        for observer in observers {
            observer(message);
        }
    }

    fn fail_ticket(&self, ticket: SendTicket) {
        let _gate = self.gate.lock();
        warn!("[Link] Send {:?} was not transmitted", ticket);
        let observers = self.failure_observers.read().clone();
        for observer in observers {
            observer(ticket);
        }
    }
}

/// One live duplex connection per session identity
///
/// The manager never interprets payloads. It owns the connection state,
/// reconnects after unsolicited drops according to its
/// [`ReconnectionStrategy`] and reports everything through observers:
///
/// - `on_message` for every inbound data frame, in arrival order
/// - `on_state_change` for every accepted state transition
/// - `on_send_failure` for tickets whose frame never reached the wire
///
/// Observers run one at a time, never concurrently with each other. They must
/// not block; forwarding into a channel is the intended use.
pub struct ConnectionManager {
    config: Arc<ConnectionConfig>,
    shared: Arc<Shared>,
    command_tx: Mutex<Option<UnboundedSender<ClientCommand>>>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    next_ticket: AtomicU64,
}

impl ConnectionManager {
    /// Start building a connection manager
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new()
    }

    pub(crate) fn new(config: ConnectionConfig) -> Self {
        Self {
            config: Arc::new(config),
            shared: Arc::new(Shared::new()),
            command_tx: Mutex::new(None),
            task_handle: Mutex::new(None),
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Begin connecting to `endpoint`
    ///
    /// Never fails: transport errors land in `Disconnected` with a retry
    /// scheduled by the strategy. Ignored unless the manager is idle in
    /// `Disconnected`. Must be called from within a tokio runtime.
    pub fn open(&self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        let mut task_slot = self.task_handle.lock();

        if task_slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("[Link] open({}) ignored: I/O task already running", endpoint);
            return;
        }
        if self.state() != ConnectionState::Disconnected {
            debug!("[Link] open({}) ignored in state {}", endpoint, self.state());
            return;
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let (command_tx, command_rx) = unbounded_channel();
        *self.command_tx.lock() = Some(command_tx);

        info!("[Link] Opening {}", endpoint);
        let config = Arc::clone(&self.config);
        let shared = Arc::clone(&self.shared);
        *task_slot = Some(tokio::spawn(async move {
            run_link(endpoint, config, shared, command_rx, epoch).await;
        }));
    }

    /// Queue a frame for transmission
    ///
    /// Returns `None` (nothing queued) unless the state is `Connected`.
    /// A returned ticket is either written to the wire or reported to the
    /// `on_send_failure` observers.
    pub fn send(&self, payload: WsMessage) -> Option<SendTicket> {
        if !self.is_connected() {
            debug!("[Link] Not connected, send refused");
            return None;
        }

        let ticket = SendTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        let sender = self.command_tx.lock();
        let Some(tx) = sender.as_ref() else {
            debug!("[Link] No I/O task, send refused");
            return None;
        };
        if tx.send(ClientCommand::Send(ticket, payload)).is_err() {
            debug!("[Link] I/O task gone, send refused");
            return None;
        }
        Some(ticket)
    }

    /// Close the connection and stop reconnecting
    ///
    /// Transitions to `Closing`, then `Disconnected` once the I/O task has
    /// wound down. Idempotent. No frame is delivered to observers after this
    /// call returns.
    pub fn close(&self) {
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        let sender = self.command_tx.lock().take();

        if sender.is_none() && self.state() == ConnectionState::Disconnected {
            return;
        }
        if !self.shared.transition(ConnectionState::Closing) {
            return;
        }
        info!("[Link] Close requested");

        // A closed channel means the I/O task is gone and will not finish the transition
        let delivered = sender.is_some_and(|tx| tx.send(ClientCommand::Close).is_ok());
        if !delivered {
            self.shared.transition(ConnectionState::Disconnected);
        }
    }

    /// Close and wait for the I/O task to exit
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.task_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Register a frame observer
    pub fn on_message(&self, observer: impl Fn(&WsMessage) + Send + Sync + 'static) {
        self.shared.frame_observers.write().push(Arc::new(observer));
    }

    /// Register a state-change observer
    pub fn on_state_change(&self, observer: impl Fn(ConnectionState) + Send + Sync + 'static) {
        self.shared.state_observers.write().push(Arc::new(observer));
    }

    /// Register a send-failure observer
    pub fn on_send_failure(&self, observer: impl Fn(SendTicket) + Send + Sync + 'static) {
        self.shared.failure_observers.write().push(Arc::new(observer));
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    pub fn metrics(&self) -> Metrics {
        self.shared.metrics.snapshot(self.state())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// I/O task: connect, drive, reconnect until closed or out of attempts
async fn run_link(
    endpoint: String,
    config: Arc<ConnectionConfig>,
    shared: Arc<Shared>,
    mut command_rx: UnboundedReceiver<ClientCommand>,
    epoch: u64,
) {
    let mut attempt = 0usize;

    'reconnect: loop {
        if !shared.transition(ConnectionState::Connecting) {
            break;
        }

        match connect(&endpoint, &config).await {
            Ok(ws_stream) => {
                if !shared.transition(ConnectionState::Connected) {
                    // Closed while the handshake was in flight
                    break;
                }
                info!("[Link] Connected to {}", endpoint);
                attempt = 0;

                match drive_connection(ws_stream, &shared, &mut command_rx, epoch).await {
                    LinkExit::Closed => break,
                    LinkExit::Dropped(err) => {
                        warn!("[Link] Connection lost: {}", err);
                        shared.transition(ConnectionState::Disconnected);
                    }
                }
            }
            Err(LinkError::InvalidEndpoint(reason)) => {
                warn!("[Link] Invalid endpoint {}: {}", endpoint, reason);
                shared.transition(ConnectionState::Disconnected);
                break;
            }
            Err(err) => {
                warn!("[Link] Connect to {} failed: {}", endpoint, err);
                shared.transition(ConnectionState::Disconnected);
            }
        }

        if !shared.is_current(epoch) {
            break;
        }

        let Some(delay) = config.retry_delay(attempt) else {
            warn!(
                "[Link] Reconnection strategy exhausted after {} attempts, staying disconnected",
                attempt
            );
            break;
        };
        attempt += 1;
        shared.metrics.increment_reconnects();
        info!("[Link] Reconnecting in {:?} (attempt {})", delay, attempt);

        let wake = tokio::time::sleep(delay);
        tokio::pin!(wake);
        loop {
            tokio::select! {
                _ = &mut wake => break,
                command = command_rx.recv() => match command {
                    Some(ClientCommand::Send(ticket, _)) => shared.fail_ticket(ticket),
                    Some(ClientCommand::Close) | None => break 'reconnect,
                },
            }
        }
    }

    // Anything still queued never reached the wire
    command_rx.close();
    while let Ok(command) = command_rx.try_recv() {
        if let ClientCommand::Send(ticket, _) = command {
            shared.fail_ticket(ticket);
        }
    }

    if shared.state.get() == ConnectionState::Closing {
        shared.transition(ConnectionState::Disconnected);
    }
    debug!("[Link] I/O task exiting");
}

/// Perform the handshake, applying provider headers
async fn connect(endpoint: &str, config: &ConnectionConfig) -> Result<WsStream> {
    let mut request = endpoint
        .into_client_request()
        .map_err(|e| LinkError::InvalidEndpoint(e.to_string()))?;

    if let Some(provider) = &config.headers {
        for (key, value) in provider.get_headers().await {
            match (
                key.parse::<http::header::HeaderName>(),
                value.parse::<http::header::HeaderValue>(),
            ) {
                (Ok(name), Ok(value)) => {
                    request.headers_mut().insert(name, value);
                }
                _ => warn!("[Link] Skipping invalid header '{}'", key),
            }
        }
    }

    let (ws_stream, _) = tokio::time::timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| LinkError::Timeout(format!("connect to {}", endpoint)))?
        .map_err(|e| LinkError::WebSocket(e.to_string()))?;

    Ok(ws_stream)
}

/// Pump one established connection until it drops or is closed
async fn drive_connection(
    ws_stream: WsStream,
    shared: &Shared,
    command_rx: &mut UnboundedReceiver<ClientCommand>,
    epoch: u64,
) -> LinkExit {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(frame)) => {
                    if let Some(message) = from_tungstenite(frame) {
                        shared.metrics.increment_received();
                        shared.deliver(epoch, &message);
                    }
                }
                Some(Err(e)) => return LinkExit::Dropped(LinkError::WebSocket(e.to_string())),
                None => {
                    return LinkExit::Dropped(LinkError::ConnectionClosed("stream ended".into()))
                }
            },
            command = command_rx.recv() => match command {
                Some(ClientCommand::Send(ticket, message)) => {
                    if let Err(e) = write.send(to_tungstenite(message)).await {
                        shared.fail_ticket(ticket);
                        return LinkExit::Dropped(LinkError::WebSocket(e.to_string()));
                    }
                    shared.metrics.increment_sent();
                }
                Some(ClientCommand::Close) | None => {
                    let _ = write.close().await;
                    return LinkExit::Closed;
                }
            },
        }
    }
}

fn to_tungstenite(message: WsMessage) -> Message {
    match message {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}

fn from_tungstenite(message: Message) -> Option<WsMessage> {
    match message {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

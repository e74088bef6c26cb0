//! Common test utilities for workhub integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use workhub::application::traits::Result as StoreResult;
use workhub::domain::{HistoryRecord, HistoryScope, SendRequest};
use workhub::{MessageStore, NormalizedMessage, StoreError, SyncEventCallback};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// How the mock backend answers an outgoing message frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoMode {
    /// Record only
    Silent,
    /// Echo the frame back with a server-assigned `message_id`
    Confirm,
}

/// Mock dashboard backend speaking the socket protocol
pub struct MockBackend {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    kick_tx: broadcast::Sender<()>,
    push_tx: broadcast::Sender<String>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Value>>>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub async fn start(mode: EchoMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let (kick_tx, _) = broadcast::channel(4);
        let (push_tx, _) = broadcast::channel(64);
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let next_id = Arc::new(AtomicI64::new(100));

        let backend = Self {
            addr,
            shutdown: Arc::clone(&shutdown),
            kick_tx: kick_tx.clone(),
            push_tx: push_tx.clone(),
            connections: Arc::clone(&connections),
            received: Arc::clone(&received),
            paths: Arc::clone(&paths),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        let ctx = Connection {
                            mode,
                            kick_rx: kick_tx.subscribe(),
                            push_rx: push_tx.subscribe(),
                            shutdown: Arc::clone(&shutdown),
                            connections: Arc::clone(&connections),
                            received: Arc::clone(&received),
                            paths: Arc::clone(&paths),
                            next_id: Arc::clone(&next_id),
                        };
                        tokio::spawn(serve(stream, ctx));
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });

        backend
    }

    /// Base URL to configure sessions with
    pub fn ws_base_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn push(&self, frame: Value) {
        let _ = self.push_tx.send(frame.to_string());
    }

    pub fn push_text(&self, text: &str) {
        let _ = self.push_tx.send(text.to_string());
    }

    pub fn drop_connections(&self) {
        let _ = self.kick_tx.send(());
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Request paths of every accepted handshake
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

struct Connection {
    mode: EchoMode,
    kick_rx: broadcast::Receiver<()>,
    push_rx: broadcast::Receiver<String>,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Value>>>,
    paths: Arc<Mutex<Vec<String>>>,
    next_id: Arc<AtomicI64>,
}

async fn serve(stream: tokio::net::TcpStream, mut ctx: Connection) {
    let paths = Arc::clone(&ctx.paths);
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        paths.lock().push(request.uri().path().to_string());
        Ok(response)
    };
    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };
    ctx.connections.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let frame: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
                    ctx.received.lock().push(frame.clone());
                    if ctx.mode == EchoMode::Confirm {
                        let mut echo = frame;
                        echo["message_id"] = json!(ctx.next_id.fetch_add(1, Ordering::SeqCst));
                        if echo["type"] == "manager_message" {
                            echo["type"] = json!("manager_message_sent");
                        }
                        if write.send(Message::Text(echo.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            pushed = ctx.push_rx.recv() => {
                let Ok(text) = pushed else { break };
                if write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = ctx.kick_rx.recv() => break,
            _ = ctx.shutdown.notified() => break,
        }
    }
}

/// In-memory message store with per-scope pages and delays
#[derive(Default)]
pub struct FakeMessageStore {
    pages: Mutex<HashMap<String, Vec<HistoryRecord>>>,
    delays: Mutex<HashMap<String, Duration>>,
    fail_sends: Mutex<bool>,
    sent: Mutex<Vec<SendRequest>>,
    fetches: Mutex<Vec<HistoryScope>>,
}

fn scope_key(scope: HistoryScope) -> String {
    match scope {
        HistoryScope::Own => "own".to_string(),
        HistoryScope::Counterparty(id) => format!("with-{}", id),
    }
}

impl FakeMessageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_page(&self, scope: HistoryScope, records: Vec<HistoryRecord>) {
        self.pages.lock().insert(scope_key(scope), records);
    }

    pub fn set_delay(&self, scope: HistoryScope, delay: Duration) {
        self.delays.lock().insert(scope_key(scope), delay);
    }

    pub fn fail_sends(&self) {
        *self.fail_sends.lock() = true;
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        self.sent.lock().clone()
    }

    pub fn fetches(&self) -> Vec<HistoryScope> {
        self.fetches.lock().clone()
    }
}

#[async_trait]
impl MessageStore for FakeMessageStore {
    async fn fetch_history(&self, scope: HistoryScope) -> StoreResult<Vec<HistoryRecord>> {
        self.fetches.lock().push(scope);
        let delay = self.delays.lock().get(&scope_key(scope)).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let page = self.pages.lock().get(&scope_key(scope)).cloned();
        Ok(page.unwrap_or_default())
    }

    async fn send_message(&self, request: &SendRequest) -> StoreResult<()> {
        self.sent.lock().push(request.clone());
        if *self.fail_sends.lock() {
            return Err(StoreError::ApiError {
                status: 500,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Callback that records what the session reports
#[derive(Default)]
pub struct RecordingCallback {
    pub connectivity: Mutex<Vec<bool>>,
    pub unread: Mutex<Vec<(i64, u32)>>,
    pub history_failures: Mutex<usize>,
    pub last_messages: Mutex<Vec<NormalizedMessage>>,
}

impl RecordingCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl SyncEventCallback for RecordingCallback {
    fn on_messages_changed(&self, messages: &[NormalizedMessage]) {
        *self.last_messages.lock() = messages.to_vec();
    }

    fn on_unread(&self, counterparty: i64, unread: u32) {
        self.unread.lock().push((counterparty, unread));
    }

    fn on_connectivity_changed(&self, connected: bool) {
        self.connectivity.lock().push(connected);
    }

    fn on_history_failed(&self, _: &StoreError) {
        *self.history_failures.lock() += 1;
    }
}

pub fn record(id: i64, content: &str, sender: &str, created_at: &str) -> HistoryRecord {
    HistoryRecord {
        id: Some(id),
        content: Some(json!(content)),
        sender: Some(json!(sender)),
        created_at: Some(created_at.to_string()),
        sender_id: None,
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// An address nothing listens on
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/ws", addr)
}

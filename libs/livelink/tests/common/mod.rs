//! Common test utilities for LiveLink integration tests

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Mock WebSocket server
///
/// Optionally echoes text frames, can push frames to every client and can
/// drop every live connection without a closing handshake.
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    kick_tx: broadcast::Sender<()>,
    push_tx: broadcast::Sender<String>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    authorization: Arc<Mutex<Option<String>>>,
}

impl MockWsServer {
    /// Start a server that echoes every text frame
    pub async fn start() -> Self {
        Self::start_with(true).await
    }

    /// Start a server that only records what it receives
    pub async fn start_silent() -> Self {
        Self::start_with(false).await
    }

    async fn start_with(echo: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let (kick_tx, _) = broadcast::channel(4);
        let (push_tx, _) = broadcast::channel(64);
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let authorization = Arc::new(Mutex::new(None));

        let server = Self {
            addr,
            shutdown: Arc::clone(&shutdown),
            kick_tx: kick_tx.clone(),
            push_tx: push_tx.clone(),
            connections: Arc::clone(&connections),
            received: Arc::clone(&received),
            authorization: Arc::clone(&authorization),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        let ctx = ConnectionContext {
                            echo,
                            kick_rx: kick_tx.subscribe(),
                            push_rx: push_tx.subscribe(),
                            shutdown: Arc::clone(&shutdown),
                            connections: Arc::clone(&connections),
                            received: Arc::clone(&received),
                            authorization: Arc::clone(&authorization),
                        };
                        tokio::spawn(handle_connection(stream, ctx));
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });

        server
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Push a text frame to every connected client
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.push_tx.send(text.into());
    }

    /// Drop every live connection
    pub fn drop_connections(&self) {
        let _ = self.kick_tx.send(());
    }

    /// Number of accepted handshakes so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    pub fn authorization(&self) -> Option<String> {
        self.authorization.lock().clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct ConnectionContext {
    echo: bool,
    kick_rx: broadcast::Receiver<()>,
    push_rx: broadcast::Receiver<String>,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    authorization: Arc<Mutex<Option<String>>>,
}

async fn handle_connection(stream: tokio::net::TcpStream, mut ctx: ConnectionContext) {
    let authorization = Arc::clone(&ctx.authorization);
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if let Some(value) = request.headers().get("Authorization") {
            *authorization.lock() = value.to_str().ok().map(str::to_string);
        }
        Ok(response)
    };

    let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    ctx.connections.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws_stream.split();
    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    ctx.received.lock().push(text.clone());
                    if ctx.echo && write.send(Message::Text(text)).await.is_err() {
                        break;
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
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

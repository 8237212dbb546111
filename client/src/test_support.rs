//! In-process chat backend for transport and widget tests.
//!
//! Speaks the real wire protocol over an axum WebSocket bound to an ephemeral
//! local port: every socket gets a `connect` handshake with `sid-N` (N counts
//! sockets from zero), every inbound frame is recorded, and the behavior
//! flags control the canned replies.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use frames::{Frame, decode_frame, encode_frame};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::net::types::events;

pub(crate) const WAIT: Duration = Duration::from_secs(5);
pub(crate) const ECHO_TIMESTAMP: &str = "2024-05-01T12:00:00Z";

/// Canned replies.
#[derive(Clone, Debug, Default)]
pub(crate) struct Behavior {
    /// Answer `send_message` with a `new_message` authored by the sender.
    pub echo_messages: bool,
    /// Answer `join_chat` with this `chat_history`.
    pub history: Option<Vec<Value>>,
}

/// A frame the backend received, tagged with the socket index it came from.
#[derive(Clone, Debug)]
pub(crate) struct Received {
    pub connection: usize,
    pub frame: Frame,
}

enum Action {
    Push(Frame),
    Raw(String),
    Close,
}

#[derive(Clone)]
struct BackendState {
    behavior: Arc<Behavior>,
    sockets: Arc<AtomicUsize>,
    message_ids: Arc<AtomicUsize>,
    inbound: mpsc::UnboundedSender<Received>,
    connections: Arc<Mutex<Vec<mpsc::UnboundedSender<Action>>>>,
}

pub(crate) struct FakeBackend {
    addr: SocketAddr,
    inbound: mpsc::UnboundedReceiver<Received>,
    connections: Arc<Mutex<Vec<mpsc::UnboundedSender<Action>>>>,
    server: JoinHandle<()>,
}

impl FakeBackend {
    pub(crate) async fn start(behavior: Behavior) -> Self {
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let connections = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState {
            behavior: Arc::new(behavior),
            sockets: Arc::new(AtomicUsize::new(0)),
            message_ids: Arc::new(AtomicUsize::new(1)),
            inbound: inbound_tx,
            connections: Arc::clone(&connections),
        };

        let app = Router::new().route("/ws", get(ws_handler)).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, inbound, connections, server }
    }

    /// HTTP base URL, as a user would configure it.
    pub(crate) fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Push a frame to the most recent socket.
    pub(crate) fn push(&self, frame: Frame) {
        self.act(Action::Push(frame));
    }

    /// Push raw text to the most recent socket.
    pub(crate) fn push_raw(&self, text: &str) {
        self.act(Action::Raw(text.to_owned()));
    }

    /// Close the most recent socket from the server side.
    pub(crate) fn drop_connection(&self) {
        self.act(Action::Close);
    }

    /// Next frame received on any socket.
    pub(crate) async fn next_inbound(&mut self) -> Received {
        tokio::time::timeout(WAIT, self.inbound.recv())
            .await
            .expect("timed out waiting for inbound frame")
            .expect("fake backend stopped")
    }

    /// Whether a frame arrives within `window`.
    pub(crate) async fn inbound_within(&mut self, window: Duration) -> Option<Received> {
        tokio::time::timeout(window, self.inbound.recv()).await.ok().flatten()
    }

    fn act(&self, action: Action) {
        let connections = self.connections.lock().expect("connections lock");
        let latest = connections.last().expect("no socket connected yet");
        latest.send(action).ok().expect("socket task gone");
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<BackendState>) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, state))
}

async fn run_socket(mut socket: WebSocket, state: BackendState) {
    let connection = state.sockets.fetch_add(1, Ordering::SeqCst);
    let sid = format!("sid-{connection}");
    let (actions_tx, mut actions) = mpsc::unbounded_channel();
    state.connections.lock().expect("connections lock").push(actions_tx);

    let hello = Frame::new(events::CONNECT).with_data("sid", sid.as_str());
    if send_frame(&mut socket, &hello).await.is_err() {
        return;
    }

    let mut username = String::new();
    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { return };
                let Message::Text(text) = msg else { continue };
                let Ok(frame) = decode_frame(text.as_str()) else { continue };

                let reply = match frame.event.as_str() {
                    events::JOIN_CHAT => {
                        username = frame.str_field("username").unwrap_or_default().to_owned();
                        state.behavior.history.as_ref().map(|history| {
                            Frame::new(events::CHAT_HISTORY)
                                .with_data("messages", Value::Array(history.clone()))
                        })
                    }
                    events::SEND_MESSAGE if state.behavior.echo_messages => {
                        let id = state.message_ids.fetch_add(1, Ordering::SeqCst);
                        Some(
                            Frame::new(events::NEW_MESSAGE)
                                .with_data("id", id.to_string())
                                .with_data("username", username.as_str())
                                .with_data("message", frame.str_field("message").unwrap_or_default())
                                .with_data("timestamp", ECHO_TIMESTAMP)
                                .with_data("type", "user_message")
                                .with_data("user_id", sid.as_str()),
                        )
                    }
                    _ => None,
                };

                let _ = state.inbound.send(Received { connection, frame });
                if let Some(reply) = reply {
                    if send_frame(&mut socket, &reply).await.is_err() {
                        return;
                    }
                }
            }
            action = actions.recv() => {
                let sent = match action {
                    Some(Action::Push(frame)) => send_frame(&mut socket, &frame).await,
                    Some(Action::Raw(text)) => socket.send(Message::Text(text.into())).await,
                    Some(Action::Close) | None => {
                        let _ = socket.send(Message::Close(None)).await;
                        return;
                    }
                };
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), axum::Error> {
    socket.send(Message::Text(encode_frame(frame).into())).await
}

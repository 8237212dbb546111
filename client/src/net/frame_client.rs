//! WebSocket frame client: the [`Transport`] used against a real backend.
//!
//! LIFECYCLE
//! =========
//! `open` spawns one connection task per session. The task connects, waits
//! for the server's `connect` handshake, reports `Connected`, then pumps
//! frames both ways until the socket ends and reports `Disconnected`. Failed
//! attempts and dropped sockets are retried with exponential backoff until
//! `close` aborts the task.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures never leave the task: they are logged and fed to the
//! reconnect loop. Undecodable inbound frames become `ErrorReceived` events.
//! Commands are only accepted while a socket is live; commands queued for a
//! socket that dies before writing them are discarded, not replayed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::frame_client_parse::{event_from_text, handshake_session_id};
use crate::config::{ChatConfig, ReconnectPolicy, ws_url};
use crate::error::{ProtocolError, TransportError};
use crate::net::transport::{Command, EventStream, Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Debug)]
struct ConnectSettings {
    ws_path: String,
    connect_timeout: Duration,
    reconnect: ReconnectPolicy,
}

struct ActiveSession {
    task: JoinHandle<()>,
    outbound: mpsc::UnboundedSender<Command>,
    connected: Arc<AtomicBool>,
}

/// Tokio-tungstenite backed [`Transport`].
pub struct FrameClient {
    settings: ConnectSettings,
    session: Option<ActiveSession>,
}

impl FrameClient {
    #[must_use]
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            settings: ConnectSettings {
                ws_path: config.ws_path.clone(),
                connect_timeout: config.connect_timeout,
                reconnect: config.reconnect,
            },
            session: None,
        }
    }

    /// Whether the current session has a live, handshaken socket.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.connected.load(Ordering::Acquire))
    }
}

impl Transport for FrameClient {
    fn open(&mut self, endpoint: &str) -> EventStream {
        self.close();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(connection_loop(
            endpoint.to_owned(),
            self.settings.clone(),
            events_tx,
            outbound_rx,
            Arc::clone(&connected),
        ));

        self.session = Some(ActiveSession { task, outbound: outbound_tx, connected });
        events_rx
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
            info!("chat: transport closed");
        }
    }

    fn emit(&mut self, command: Command) {
        let Some(session) = self.session.as_ref() else {
            debug!(event = command.event_name(), "chat: no session; dropping command");
            return;
        };
        if !session.connected.load(Ordering::Acquire) {
            debug!(event = command.event_name(), "chat: not connected; dropping command");
            return;
        }
        if session.outbound.send(command).is_err() {
            debug!("chat: connection task gone; dropping command");
        }
    }
}

impl Drop for FrameClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Main connection loop with reconnect logic.
async fn connection_loop(
    endpoint: String,
    settings: ConnectSettings,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<Command>,
    connected: Arc<AtomicBool>,
) {
    let Some(url) = ws_url(&endpoint, &settings.ws_path) else {
        let error = TransportError::InvalidEndpoint(endpoint);
        warn!(error = %error, "chat: cannot connect");
        let _ = events.send(TransportEvent::ErrorReceived(error.to_string()));
        return;
    };

    let mut backoff = settings.reconnect.min;

    loop {
        debug!(%url, "chat: connecting");
        match open_socket(&url, settings.connect_timeout).await {
            Ok((stream, session_id)) => {
                backoff = settings.reconnect.min;

                let mut stale = 0_usize;
                while outbound.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    warn!(stale, "chat: discarded commands queued for previous socket");
                }

                connected.store(true, Ordering::Release);
                info!(%session_id, "chat: connected");
                if events.send(TransportEvent::Connected { session_id }).is_err() {
                    return;
                }

                let result = run_socket(stream, &events, &mut outbound).await;
                connected.store(false, Ordering::Release);
                match result {
                    Ok(()) => info!("chat: socket closed"),
                    Err(e) => warn!(error = %e, "chat: socket failed"),
                }
                if events.send(TransportEvent::Disconnected).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, retry_in = ?backoff, "chat: connect attempt failed");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = settings.reconnect.next_delay(backoff);
    }
}

/// Connect and complete the `connect` handshake, both bounded by `deadline`.
async fn open_socket(url: &str, deadline: Duration) -> Result<(WsStream, String), TransportError> {
    let (mut stream, _) = tokio::time::timeout(deadline, connect_async(url))
        .await
        .map_err(|_| TransportError::Timeout(deadline))?
        .map_err(|e| TransportError::Connect(Box::new(e)))?;

    let session_id = tokio::time::timeout(deadline, await_handshake(&mut stream))
        .await
        .map_err(|_| TransportError::Timeout(deadline))??;

    Ok((stream, session_id))
}

async fn await_handshake(stream: &mut WsStream) -> Result<String, TransportError> {
    while let Some(msg) = stream.next().await {
        match msg.map_err(|e| TransportError::Socket(Box::new(e)))? {
            Message::Text(text) => {
                let frame = frames::decode_frame(text.as_str())
                    .map_err(|e| TransportError::Handshake(e.to_string()))?;
                return handshake_session_id(&frame).map_err(|e| TransportError::Handshake(e.to_string()));
            }
            Message::Close(_) => return Err(TransportError::Closed),
            _ => {}
        }
    }
    Err(TransportError::Closed)
}

/// Pump frames until the socket ends. `Ok` means an orderly close.
async fn run_socket(
    stream: WsStream,
    events: &mpsc::UnboundedSender<TransportEvent>,
    outbound: &mut mpsc::UnboundedReceiver<Command>,
) -> Result<(), TransportError> {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                let Some(msg) = msg else { return Ok(()) };
                let event = match msg.map_err(|e| TransportError::Socket(Box::new(e)))? {
                    Message::Text(text) => event_from_text(text.as_str()),
                    Message::Binary(_) => {
                        warn!("chat: binary frame from server");
                        TransportEvent::ErrorReceived(ProtocolError::UnexpectedBinary.to_string())
                    }
                    Message::Close(_) => return Ok(()),
                    _ => continue,
                };
                if events.send(event).is_err() {
                    return Ok(());
                }
            }
            command = outbound.recv() => {
                let Some(command) = command else { return Ok(()) };
                let text = frames::encode_frame(&command.to_frame());
                debug!(event = command.event_name(), "chat: send frame");
                write
                    .send(Message::text(text))
                    .await
                    .map_err(|e| TransportError::Socket(Box::new(e)))?;
            }
        }
    }
}

#[cfg(test)]
#[path = "frame_client_test.rs"]
mod frame_client_test;

//! Chat controller: the state machine between the widget and the transport.
//!
//! DESIGN
//! ======
//! The controller is the only component that both consumes transport events
//! and issues transport commands. Every transition runs to completion on
//! `&mut self`, so no two transitions ever interleave.
//!
//! States: `Idle` -> `Connecting` -> `Connected` (not joined) -> `Joined`.
//! A transport disconnect from any connected state returns to `Connecting`
//! while the widget is open; closing the widget returns to `Idle` from
//! anywhere.
//!
//! Joins and sends are optimistic. A join counts as soon as it is emitted and
//! a sent message appears in the log only when the backend pushes it back,
//! so there is never a local echo to reconcile.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::error::ValidationError;
use crate::net::transport::{Command, EventStream, Transport, TransportEvent};
use crate::state::ConnectionStatus;
use crate::state::chat::{Message, MessageKind, MessageLog, signal_notice_text};
use crate::state::membership::{JoinRequest, Membership};

pub const DEFAULT_SIGNAL_ASSET: &str = "EURUSD";
pub const DEFAULT_SIGNAL_TIMEFRAME: &str = "1m";

const CONNECTING_BANNER: &str = "Connecting to chat server...";

/// UI-visible controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChatState {
    /// Widget closed, no connection.
    #[default]
    Idle,
    Connecting,
    /// Connected but not joined to a room.
    Connected,
    Joined,
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Joined => "joined",
        };
        f.write_str(label)
    }
}

/// Snapshot of everything a front-end renders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatView {
    pub state: ChatState,
    pub banner: Option<&'static str>,
    pub room: Option<String>,
    pub display_name: Option<String>,
    pub messages: Vec<Message>,
    /// Log revision; changes when earlier entries were replaced or cleared.
    pub revision: u64,
    pub badge: Option<String>,
}

pub struct ChatController<T: Transport> {
    transport: T,
    config: ChatConfig,
    connection: ConnectionStatus,
    widget_open: bool,
    session_id: Option<String>,
    membership: Membership,
    log: MessageLog,
    events: Option<EventStream>,
}

impl<T: Transport> ChatController<T> {
    #[must_use]
    pub fn new(transport: T, config: ChatConfig) -> Self {
        Self {
            transport,
            config,
            connection: ConnectionStatus::Disconnected,
            widget_open: false,
            session_id: None,
            membership: Membership::new(),
            log: MessageLog::new(),
            events: None,
        }
    }

    /// Open the widget: `Idle -> Connecting`. No-op when already open.
    pub fn open(&mut self) {
        if self.widget_open {
            debug!("chat: open ignored; widget already open");
            return;
        }
        self.widget_open = true;
        self.set_connection(ConnectionStatus::Connecting);
        info!(endpoint = %self.config.endpoint, "chat: opening");
        self.events = Some(self.transport.open(&self.config.endpoint));
    }

    /// Close the widget from any state. Tears down the transport, drops its
    /// event stream, forgets the last join and clears the log. Idempotent.
    pub fn close(&mut self) {
        self.transport.close();
        self.events = None;
        self.set_connection(ConnectionStatus::Disconnected);
        self.membership.reset();
        self.session_id = None;
        self.log.clear();
        if std::mem::replace(&mut self.widget_open, false) {
            info!("chat: closed");
        }
    }

    /// Wait for the next transport event.
    ///
    /// Pends forever while no session is open or after the session's stream
    /// has ended, which makes it safe to use as a `select!` branch.
    pub async fn next_event(&mut self) -> TransportEvent {
        if let Some(events) = self.events.as_mut() {
            if let Some(event) = events.recv().await {
                return event;
            }
            warn!("chat: transport event stream ended");
            self.events = None;
        }
        std::future::pending().await
    }

    /// Apply one transport event.
    pub fn handle_event(&mut self, event: TransportEvent) {
        if !self.widget_open {
            debug!(?event, "chat: event ignored; widget closed");
            return;
        }

        match event {
            TransportEvent::Connected { session_id } => {
                info!(%session_id, "chat: connected");
                self.session_id = Some(session_id);
                self.set_connection(ConnectionStatus::Connected);
                self.rejoin();
            }
            TransportEvent::Disconnected => {
                self.set_connection(ConnectionStatus::Connecting);
                self.session_id = None;
                info!("chat: disconnected; waiting for reconnect");
            }
            TransportEvent::ConnectionAck(text) => {
                self.log.append_system(text, MessageKind::SystemNotice);
            }
            TransportEvent::UserJoined(name) => {
                self.log
                    .append_system(format!("{name} joined the chat"), MessageKind::SystemNotice);
            }
            TransportEvent::UserLeft(name) => {
                let text = match name {
                    Some(name) => format!("{name} left the chat"),
                    None => "User left the chat".to_owned(),
                };
                self.log.append_system(text, MessageKind::SystemNotice);
            }
            TransportEvent::MessageReceived(wire) => {
                if self.connection != ConnectionStatus::Connected {
                    debug!(id = %wire.id, "chat: message ignored; not connected");
                    return;
                }
                let message = Message::from_wire(wire, self.session_id.as_deref());
                self.log.append(message);
            }
            TransportEvent::HistoryReceived(records) => {
                if !self.membership.is_joined() {
                    debug!(count = records.len(), "chat: history ignored; not joined");
                    return;
                }
                let own = self.session_id.as_deref();
                let messages = records
                    .into_iter()
                    .map(|wire| Message::from_wire(wire, own))
                    .collect::<Vec<_>>();
                debug!(count = messages.len(), "chat: history replayed");
                self.log.replace_all(messages);
            }
            TransportEvent::SignalPush(signal) => {
                self.log
                    .append_system(signal_notice_text(&signal), MessageKind::SystemNotice);
            }
            TransportEvent::ErrorReceived(text) => {
                warn!(%text, "chat: error from backend");
                self.log.append_system(format!("Error: {text}"), MessageKind::ErrorNotice);
            }
        }
    }

    /// Join `room` as `display_name`. Only actionable while connected and
    /// not yet joined.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] and emits nothing when the input is
    /// blank or the state does not allow a join.
    pub fn join(&mut self, room: &str, display_name: &str) -> Result<(), ValidationError> {
        let connection = if self.widget_open {
            self.connection
        } else {
            ConnectionStatus::Disconnected
        };
        let request = self.membership.request_join(room, display_name, connection)?;
        self.emit_join(request);
        Ok(())
    }

    /// Send a chat message to the joined room. The message is not added to
    /// the log until the backend delivers it.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyMessage`] for blank text,
    /// [`ValidationError::NotJoined`] outside the `Joined` state.
    pub fn send(&mut self, body: &str) -> Result<(), ValidationError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        if self.state() != ChatState::Joined {
            return Err(ValidationError::NotJoined);
        }
        let room = self.membership.room().ok_or(ValidationError::NotJoined)?.to_owned();
        self.transport.emit(Command::Send { room, body: body.to_owned() });
        Ok(())
    }

    /// Ask the backend to push a fresh signal for `asset` on `timeframe`.
    /// Allowed whenever connected, joined or not.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptySignalField`] for a blank field,
    /// [`ValidationError::NotConnected`] when not connected.
    pub fn request_signal_update(
        &mut self,
        asset: &str,
        timeframe: &str,
    ) -> Result<(), ValidationError> {
        let asset = asset.trim();
        if asset.is_empty() {
            return Err(ValidationError::EmptySignalField("asset"));
        }
        let timeframe = timeframe.trim();
        if timeframe.is_empty() {
            return Err(ValidationError::EmptySignalField("timeframe"));
        }
        if !matches!(self.state(), ChatState::Connected | ChatState::Joined) {
            return Err(ValidationError::NotConnected);
        }
        self.transport.emit(Command::RequestSignalUpdate {
            asset: asset.to_owned(),
            timeframe: timeframe.to_owned(),
        });
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> ChatState {
        if !self.widget_open {
            return ChatState::Idle;
        }
        match self.connection {
            ConnectionStatus::Connected if self.membership.is_joined() => ChatState::Joined,
            ConnectionStatus::Connected => ChatState::Connected,
            ConnectionStatus::Connecting | ConnectionStatus::Disconnected => ChatState::Connecting,
        }
    }

    /// Informational banner, shown only while connecting.
    #[must_use]
    pub fn banner(&self) -> Option<&'static str> {
        (self.state() == ChatState::Connecting).then_some(CONNECTING_BANNER)
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    #[must_use]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    #[must_use]
    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Own connection identifier of the current socket.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    #[must_use]
    pub fn view(&self) -> ChatView {
        ChatView {
            state: self.state(),
            banner: self.banner(),
            room: self.membership.room().map(str::to_owned),
            display_name: self.membership.display_name().map(str::to_owned),
            messages: self.log.messages().to_vec(),
            revision: self.log.revision(),
            badge: self.log.badge_label(),
        }
    }

    /// Cheap fingerprint of [`ChatController::view`]. Room, name, banner and
    /// badge follow from the state and the log length, and the log only
    /// changes earlier entries when its revision moves.
    pub(crate) fn view_key(&self) -> (ChatState, u64, usize) {
        (self.state(), self.log.revision(), self.log.len())
    }

    /// Membership is updated before the new status is stored, so nothing can
    /// observe a non-connected status with a live join.
    fn set_connection(&mut self, status: ConnectionStatus) {
        self.membership.on_connection_change(status);
        self.connection = status;
    }

    fn rejoin(&mut self) {
        if !self.config.auto_rejoin {
            return;
        }
        let Some(last) = self.membership.last_join() else {
            return;
        };
        match self
            .membership
            .request_join(&last.room, &last.display_name, self.connection)
        {
            Ok(request) => {
                info!(room = %request.room, "chat: rejoining after reconnect");
                self.emit_join(request);
            }
            Err(err) => debug!(%err, "chat: auto-rejoin skipped"),
        }
    }

    fn emit_join(&mut self, request: JoinRequest) {
        info!(room = %request.room, username = %request.display_name, "chat: joining");
        self.transport.emit(Command::Join {
            room: request.room,
            username: request.display_name,
        });
    }
}

//! Transport seam between the chat controller and the realtime connection.
//!
//! The controller only ever talks to a [`Transport`]: it opens one session per
//! open widget, reads typed [`TransportEvent`]s from the stream that `open`
//! returns, and fires [`Command`]s without waiting for replies. Dropping the
//! stream is how the controller stops observing a closed session.

use tokio::sync::mpsc;

use crate::net::types::{Frame, Signal, WireMessage, events};

/// Typed inbound events, in backend delivery order.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The socket completed its handshake. `session_id` is this client's own
    /// connection identifier for the lifetime of the socket.
    Connected { session_id: String },
    /// A previously connected socket went away.
    Disconnected,
    ConnectionAck(String),
    UserJoined(String),
    /// Someone left; the backend does not always name them.
    UserLeft(Option<String>),
    MessageReceived(WireMessage),
    HistoryReceived(Vec<WireMessage>),
    SignalPush(Signal),
    /// A backend error or a frame that could not be interpreted.
    ErrorReceived(String),
}

/// Fire-and-forget commands sent to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Join { room: String, username: String },
    Send { room: String, body: String },
    RequestSignalUpdate { asset: String, timeframe: String },
}

impl Command {
    /// Wire event name for this command.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Join { .. } => events::JOIN_CHAT,
            Self::Send { .. } => events::SEND_MESSAGE,
            Self::RequestSignalUpdate { .. } => events::REQUEST_SIGNAL_UPDATE,
        }
    }

    /// Build the outbound frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let frame = Frame::new(self.event_name());
        match self {
            Self::Join { room, username } => frame
                .with_data("room", room.as_str())
                .with_data("username", username.as_str()),
            Self::Send { room, body } => frame
                .with_data("room", room.as_str())
                .with_data("message", body.as_str()),
            Self::RequestSignalUpdate { asset, timeframe } => frame
                .with_data("asset", asset.as_str())
                .with_data("timeframe", timeframe.as_str()),
        }
    }
}

/// Inbound events of one opened session.
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// A realtime connection to the chat backend.
pub trait Transport {
    /// Start connecting to `endpoint` and return the session's event stream.
    ///
    /// Must not block: completion is reported as [`TransportEvent::Connected`].
    /// Opening while a session exists replaces that session.
    fn open(&mut self, endpoint: &str) -> EventStream;

    /// Tear down the current session, if any. Idempotent.
    fn close(&mut self);

    /// Send a command. Dropped silently when not connected.
    fn emit(&mut self, command: Command);
}

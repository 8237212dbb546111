//! Error taxonomy for the chat client.
//!
//! Nothing here is fatal. Validation errors are returned to the caller and
//! never reach the socket, transport errors end one connection attempt and
//! feed the reconnect loop, and protocol errors are rendered into the chat log
//! as error notices.

use std::time::Duration;

/// A user command was rejected locally; no frame was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("display name must not be empty")]
    EmptyDisplayName,
    #[error("room name must not be empty")]
    EmptyRoom,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("signal request field `{0}` must not be empty")]
    EmptySignalField(&'static str),
    #[error("not connected to the chat server")]
    NotConnected,
    #[error("join a room before sending messages")]
    NotJoined,
    #[error("already joined a room")]
    AlreadyJoined,
}

/// One connection attempt or live socket failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid chat endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket error: {0}")]
    Socket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("websocket closed")]
    Closed,
}

/// The backend sent something this client cannot interpret.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Codec(#[from] frames::CodecError),
    #[error("unexpected event `{0}`")]
    UnexpectedEvent(String),
    #[error("invalid `{event}` payload: {reason}")]
    InvalidPayload { event: String, reason: String },
    #[error("unexpected binary frame")]
    UnexpectedBinary,
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got `{value}`")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be a boolean, got `{value}`")]
    InvalidBool { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("reconnect delay bounds are inverted: min {min_ms}ms > max {max_ms}ms")]
    BackoffBounds { min_ms: u128, max_ms: u128 },
    #[error("endpoint must start with http://, https://, ws:// or wss://, got `{0}`")]
    InvalidEndpoint(String),
    #[error("default room must not be empty")]
    EmptyRoom,
}

/// Error returned by [`crate::widget::ChatWidget`] commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("chat widget task has stopped")]
    Stopped,
}

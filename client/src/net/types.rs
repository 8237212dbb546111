//! Wire-protocol DTOs for the chat backend boundary.
//!
//! DESIGN
//! ======
//! Inbound payloads are decoded with serde into these types; anything that
//! does not fit becomes a protocol error upstream rather than a partially
//! filled record. Identifiers are normalized to strings because the backend
//! is not consistent about sending them as strings or numbers.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

pub use frames::Frame;

/// Wire event names.
pub mod events {
    /// Handshake sent by the server as the first frame of every socket.
    pub const CONNECT: &str = "connect";
    pub const CONNECTION_RESPONSE: &str = "connection_response";
    pub const USER_JOINED: &str = "user_joined";
    pub const USER_LEFT: &str = "user_left";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const CHAT_HISTORY: &str = "chat_history";
    pub const SIGNAL_UPDATE: &str = "signal_update";
    pub const ERROR: &str = "error";

    pub const JOIN_CHAT: &str = "join_chat";
    pub const SEND_MESSAGE: &str = "send_message";
    pub const REQUEST_SIGNAL_UPDATE: &str = "request_signal_update";
}

/// A chat message as delivered by the backend (`new_message` or one entry of
/// `chat_history`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct WireMessage {
    /// Server-assigned message identifier.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Author display name. Not unique across participants.
    pub username: String,
    /// Message text.
    #[serde(rename = "message")]
    pub body: String,
    /// Server timestamp, usually ISO-8601.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Raw message type (`user_message`, `system`, `ai_response`, `error`).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Connection identifier of the author.
    #[serde(rename = "user_id", default, deserialize_with = "deserialize_opt_id")]
    pub author_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct WireHistory {
    pub messages: Vec<WireMessage>,
}

/// A newly generated trading signal pushed to chat participants.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Signal {
    pub asset: String,
    pub direction: String,
    /// Confidence in percent.
    pub confidence: f64,
    pub tier: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct WireSignalUpdate {
    pub signal: Signal,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    id_from_value(value).map_err(D::Error::custom)
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    id_from_value(value).map(Some).map_err(D::Error::custom)
}

fn id_from_value(value: serde_json::Value) -> Result<String, &'static str> {
    match value {
        serde_json::Value::String(id) if !id.is_empty() => Ok(id),
        serde_json::Value::String(_) => Err("identifier must not be empty"),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        _ => Err("expected string or number identifier"),
    }
}

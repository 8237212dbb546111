//! Shared frame model and JSON codec for the realtime chat transport.
//!
//! This crate owns the wire representation used by the chat `client` and by
//! the fake backends in its tests. Every message on the socket is one text
//! frame shaped as `{"event": <name>, "data": <object>}`; payloads stay
//! flexible (`serde_json::Value`) so event-specific decoding lives with the
//! consumer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw text is not valid JSON or not a JSON object.
    #[error("failed to decode frame json: {0}")]
    Json(#[from] serde_json::Error),
    /// The envelope has no `event` name, or an empty one.
    #[error("frame is missing an event name")]
    MissingEvent,
    /// The `data` member is present but is not a JSON object.
    #[error("frame data for `{0}` must be an object")]
    InvalidData(String),
}

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name, e.g. `"new_message"` or `"join_chat"`.
    pub event: String,
    /// Event payload. Always a JSON object after decoding.
    pub data: Value,
}

impl Frame {
    /// Create a frame with an empty payload.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: Value::Object(Map::new()),
        }
    }

    /// Set one payload field, replacing any previous value under `key`.
    #[must_use]
    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.data {
            map.insert(key.to_owned(), value.into());
        }
        self
    }

    /// Look up a string field in the payload.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Encode a frame into its JSON text form.
#[must_use]
pub fn encode_frame(frame: &Frame) -> String {
    let wire = WireFrameRef {
        event: &frame.event,
        data: &frame.data,
    };
    // Serializing a `Value` with string keys cannot fail; the only errors
    // serde_json reports here come from custom `Serialize` impls.
    serde_json::to_string(&wire).unwrap_or_default()
}

/// Decode JSON text into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text, [`CodecError::MissingEvent`]
/// when the envelope has no usable event name, and [`CodecError::InvalidData`]
/// when `data` is not an object.
pub fn decode_frame(text: &str) -> Result<Frame, CodecError> {
    let wire = serde_json::from_str::<WireFrame>(text)?;
    wire_to_frame(wire)
}

fn wire_to_frame(wire: WireFrame) -> Result<Frame, CodecError> {
    let event = wire
        .event
        .filter(|name| !name.trim().is_empty())
        .ok_or(CodecError::MissingEvent)?;
    let data = match wire.data {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::Object(map)) => Value::Object(map),
        Some(_) => return Err(CodecError::InvalidData(event)),
    };
    Ok(Frame { event, data })
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Serialize)]
struct WireFrameRef<'a> {
    event: &'a str,
    data: &'a Value,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

//! Inbound frame decoding for `frame_client`.
//!
//! Every text frame becomes exactly one [`TransportEvent`]. Frames that fail
//! to decode, name an unknown event, or carry a payload of the wrong shape are
//! turned into [`TransportEvent::ErrorReceived`] so nothing is dropped
//! silently.

#[cfg(test)]
#[path = "frame_client_parse_test.rs"]
mod frame_client_parse_test;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::ProtocolError;
use crate::net::transport::TransportEvent;
use crate::net::types::{Frame, WireHistory, WireMessage, WireSignalUpdate, events};

/// Decode one inbound text frame, folding protocol errors into the event.
pub(crate) fn event_from_text(text: &str) -> TransportEvent {
    match parse_text(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "chat: protocol error");
            TransportEvent::ErrorReceived(e.to_string())
        }
    }
}

pub(crate) fn parse_text(text: &str) -> Result<TransportEvent, ProtocolError> {
    let frame = frames::decode_frame(text)?;
    event_from_frame(&frame)
}

pub(crate) fn event_from_frame(frame: &Frame) -> Result<TransportEvent, ProtocolError> {
    match frame.event.as_str() {
        events::CONNECTION_RESPONSE => Ok(TransportEvent::ConnectionAck(
            required_str(frame, "message")?.to_owned(),
        )),
        events::USER_JOINED => Ok(TransportEvent::UserJoined(
            required_str(frame, "username")?.to_owned(),
        )),
        events::USER_LEFT => Ok(TransportEvent::UserLeft(
            frame
                .str_field("username")
                .filter(|name| !name.trim().is_empty())
                .map(ToOwned::to_owned),
        )),
        events::NEW_MESSAGE => payload::<WireMessage>(frame).map(TransportEvent::MessageReceived),
        events::CHAT_HISTORY => {
            payload::<WireHistory>(frame).map(|history| TransportEvent::HistoryReceived(history.messages))
        }
        events::SIGNAL_UPDATE => {
            payload::<WireSignalUpdate>(frame).map(|update| TransportEvent::SignalPush(update.signal))
        }
        events::ERROR => Ok(TransportEvent::ErrorReceived(
            required_str(frame, "message")?.to_owned(),
        )),
        other => Err(ProtocolError::UnexpectedEvent(other.to_owned())),
    }
}

/// Extract the session id from a `connect` handshake frame.
pub(crate) fn handshake_session_id(frame: &Frame) -> Result<String, ProtocolError> {
    if frame.event != events::CONNECT {
        return Err(ProtocolError::UnexpectedEvent(frame.event.clone()));
    }
    Ok(required_str(frame, "sid")?.to_owned())
}

fn payload<T: DeserializeOwned>(frame: &Frame) -> Result<T, ProtocolError> {
    serde_json::from_value::<T>(frame.data.clone()).map_err(|e| ProtocolError::InvalidPayload {
        event: frame.event.clone(),
        reason: e.to_string(),
    })
}

fn required_str<'a>(frame: &'a Frame, key: &str) -> Result<&'a str, ProtocolError> {
    frame
        .str_field(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ProtocolError::InvalidPayload {
            event: frame.event.clone(),
            reason: format!("missing string field `{key}`"),
        })
}

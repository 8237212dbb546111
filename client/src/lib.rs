//! Live chat client for the trading-signal dashboard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Inbound events flow transport -> controller -> message log -> view, and
//! user commands flow view -> controller -> transport. Only the
//! [`controller::ChatController`] touches both directions; the
//! [`widget::ChatWidget`] runtime feeds it one input at a time.

pub mod config;
pub mod controller;
pub mod error;
pub mod net;
pub mod state;
pub mod widget;

#[cfg(test)]
mod test_support;

pub use config::ChatConfig;
pub use controller::{ChatController, ChatState, ChatView};
pub use error::{ChatError, ValidationError};
pub use net::frame_client::FrameClient;
pub use widget::ChatWidget;

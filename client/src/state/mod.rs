//! Client-side chat state.
//!
//! `chat` holds the message view model rendered to the user and `membership`
//! tracks the single joined room. Both are owned by the controller.

pub mod chat;
pub mod membership;

/// Lifecycle state of the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No socket; the widget is closed.
    #[default]
    Disconnected,
    /// A socket is being opened or re-opened.
    Connecting,
    /// The socket is open and the server completed the `connect` handshake.
    Connected,
}

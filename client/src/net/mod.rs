//! Networking modules for the realtime chat connection.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` defines the seam the controller depends on, `frame_client`
//! implements it over a websocket, and `types` defines the wire schema.

pub mod frame_client;
mod frame_client_parse;
pub mod transport;
pub mod types;

//! Puck Relay - two-player air hockey over a WebSocket relay
//!
//! The server pairs two connections into a room, relays paddle and puck state
//! between them, and keeps the authoritative score. The client half smooths
//! the relayed state for rendering.

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod rooms;
pub mod util;
pub mod ws;

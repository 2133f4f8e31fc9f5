//! Roomcast Transport Layer
//!
//! Provides the WebSocket transport for the Roomcast server.
//! The transport layer handles:
//! - Connection lifecycle (accept, frame, close)
//! - Connection ids and the optional `?name=` handshake parameter
//! - Heartbeat / stale connection detection
//! - Per-connection outbound queues
//!
//! The transport is decoupled from the chat logic via the `EventHandler` and
//! `Outbox` traits.

pub mod client;
pub mod peers;
pub mod server;

pub use client::ClientConnection;
pub use peers::{Outbox, PeerTable};
pub use server::{EventHandler, TransportConfig, TransportServer};

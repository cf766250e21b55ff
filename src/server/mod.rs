//! WebSocket signaling server
//!
//! The listener accepts TCP connections, upgrades them to WebSocket and
//! hands each one to a [`Connection`], which owns the socket for the
//! lifetime of the peer.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::SignalingServer;

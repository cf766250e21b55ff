//! WebRTC SFU signaling server library
//!
//! Session bookkeeping and negotiation for a selective forwarding unit:
//! peers connect over WebSocket, exchange transport/producer/consumer
//! setup requests, and get pushed events (`welcome`, `newProducer`,
//! `producerClosed`) as the room changes around them. Media itself never
//! passes through this crate; all RTP work is delegated to a
//! [`MediaEngine`](media::MediaEngine) implementation behind a trait
//! seam, with an in-process [`LoopbackEngine`](media::LoopbackEngine)
//! for tests and demos.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sfu_signaling::{EngineGate, LoopbackEngine, ServerConfig, SignalingServer};
//!
//! #[tokio::main]
//! async fn main() -> sfu_signaling::Result<()> {
//!     let config = ServerConfig::with_addr("0.0.0.0:3000".parse().unwrap());
//!     let engine = Arc::new(EngineGate::ready(Arc::new(LoopbackEngine::new())));
//!
//!     let server = SignalingServer::bind(config, engine).await?;
//!     server.run().await
//! }
//! ```
//!
//! # Architecture
//!
//! - [`server`]: TCP accept loop, WebSocket upgrade, per-connection loop
//! - [`session`]: per-peer request handling, push fan-out, lifecycle
//! - [`registry`]: the maps tracking live transports/producers/consumers
//! - [`protocol`]: wire messages, request/reply framing, error taxonomy
//! - [`media`]: the engine trait seam and the loopback implementation

pub mod error;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use error::{Error, Result};
pub use media::engine::{EngineGate, MediaEngine};
pub use media::loopback::{LoopbackConfig, LoopbackEngine};
pub use media::types::{MediaKind, PeerId};
pub use registry::store::SessionRegistry;
pub use server::config::ServerConfig;
pub use server::listener::SignalingServer;
pub use session::hub::PeerHub;

//! Media engine abstraction and shared media types
//!
//! This module provides:
//! - The vocabulary types (peers, kinds, opaque RTP/ICE/DTLS blobs)
//! - The `MediaEngine` trait family the signaling core talks to
//! - The write-once `EngineGate` that holds the engine once it is ready
//! - A loopback engine implementation for tests and demos

pub mod engine;
pub mod loopback;
pub mod types;

pub use engine::{
    EngineError, EngineGate, MediaConsumer, MediaEngine, MediaProducer, MediaTransport,
};
pub use loopback::{LoopbackConfig, LoopbackEngine};
pub use types::{
    ConsumerParams, DtlsParameters, IceCandidate, IceParameters, MediaKind, PeerId,
    RtpCapabilities, RtpParameters, TransportDirection, TransportParams,
};

//! Media engine abstraction
//!
//! The signaling server never touches RTP itself. All media work is
//! delegated to an engine behind these traits: a production deployment
//! binds them to a real SFU router, tests and demos use the in-process
//! [`LoopbackEngine`](crate::media::loopback::LoopbackEngine).
//!
//! Close propagation is modelled with [`CancellationToken`]s rather than
//! callbacks. Every engine object exposes a `closed()` token that fires
//! when the object dies, whichever side initiated it. Consumers expose an
//! additional `source_closed()` token that fires when the producer they
//! are bound to goes away, which is what drives `producerClosed` pushes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use super::types::{DtlsParameters, MediaKind, RtpCapabilities, RtpParameters, TransportParams};

/// Error type for media engine operations
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Operation on an object that is already closed
    Closed(&'static str),
    /// The engine refused the operation
    Rejected(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Closed(what) => write!(f, "{} is closed", what),
            EngineError::Rejected(reason) => write!(f, "engine rejected operation: {}", reason),
        }
    }
}

impl std::error::Error for EngineError {}

/// A media routing engine (one router per server instance)
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// RTP capabilities of the router, advertised to clients
    fn rtp_capabilities(&self) -> RtpCapabilities;

    /// Create a new WebRTC transport
    async fn create_transport(&self) -> Result<Arc<dyn MediaTransport>, EngineError>;

    /// Whether a subscriber with the given capabilities can consume the producer
    async fn can_consume(&self, producer_id: &str, rtp_capabilities: &RtpCapabilities) -> bool;
}

/// A WebRTC transport created by the engine
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Engine-assigned transport id
    fn id(&self) -> &str;

    /// Connection parameters to hand to the client
    fn params(&self) -> TransportParams;

    /// Complete the DTLS handshake with parameters from the client
    async fn connect(&self, dtls_parameters: DtlsParameters) -> Result<(), EngineError>;

    /// Start producing media on this transport
    async fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<Arc<dyn MediaProducer>, EngineError>;

    /// Start consuming a producer on this transport
    async fn consume(
        &self,
        producer_id: &str,
        rtp_capabilities: RtpCapabilities,
        paused: bool,
    ) -> Result<Arc<dyn MediaConsumer>, EngineError>;

    /// Close the transport and everything created on it
    async fn close(&self);

    /// Token cancelled when the transport closes
    fn closed(&self) -> CancellationToken;
}

/// A media producer (one incoming track)
#[async_trait]
pub trait MediaProducer: Send + Sync {
    /// Engine-assigned producer id
    fn id(&self) -> &str;

    /// Kind of media this producer carries
    fn kind(&self) -> MediaKind;

    /// Close the producer
    async fn close(&self);

    /// Token cancelled when the producer closes
    fn closed(&self) -> CancellationToken;
}

/// A media consumer (one outgoing track bound to a producer)
#[async_trait]
pub trait MediaConsumer: Send + Sync {
    /// Engine-assigned consumer id
    fn id(&self) -> &str;

    /// Kind of media this consumer carries
    fn kind(&self) -> MediaKind;

    /// Engine id of the producer this consumer is bound to
    fn producer_id(&self) -> &str;

    /// RTP parameters the subscribing client needs
    fn rtp_parameters(&self) -> RtpParameters;

    /// Whether the consumer is currently paused
    fn paused(&self) -> bool;

    /// Resume a paused consumer
    async fn resume(&self) -> Result<(), EngineError>;

    /// Close the consumer
    async fn close(&self);

    /// Token cancelled when the consumer closes
    fn closed(&self) -> CancellationToken;

    /// Token cancelled when the bound producer closes
    fn source_closed(&self) -> CancellationToken;
}

/// Write-once slot for the media engine
///
/// The engine typically finishes initializing after the server has begun
/// accepting sockets. Requests that need the engine before it is provided
/// are rejected with "Router not ready" instead of blocking.
pub struct EngineGate {
    cell: OnceCell<Arc<dyn MediaEngine>>,
}

impl EngineGate {
    /// Create an empty gate
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Create a gate that is ready immediately
    pub fn ready(engine: Arc<dyn MediaEngine>) -> Self {
        let gate = Self::new();
        gate.provide(engine);
        gate
    }

    /// Install the engine
    ///
    /// Returns `false` if an engine was already installed; the first one wins.
    pub fn provide(&self, engine: Arc<dyn MediaEngine>) -> bool {
        let installed = self.cell.set(engine).is_ok();
        if installed {
            tracing::info!("Media engine ready");
        } else {
            tracing::warn!("Media engine already installed, ignoring");
        }
        installed
    }

    /// Get the engine if it has been provided
    pub fn get(&self) -> Option<&Arc<dyn MediaEngine>> {
        self.cell.get()
    }

    /// Whether the engine has been provided
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }
}

impl Default for EngineGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::loopback::LoopbackEngine;

    #[tokio::test]
    async fn test_gate_starts_empty() {
        let gate = EngineGate::new();
        assert!(!gate.is_ready());
        assert!(gate.get().is_none());
    }

    #[tokio::test]
    async fn test_gate_first_engine_wins() {
        let gate = EngineGate::new();

        assert!(gate.provide(Arc::new(LoopbackEngine::new())));
        assert!(gate.is_ready());

        // Second install is ignored
        assert!(!gate.provide(Arc::new(LoopbackEngine::new())));
        assert!(gate.get().is_some());
    }

    #[test]
    fn test_engine_error_display() {
        assert_eq!(EngineError::Closed("transport").to_string(), "transport is closed");
        assert_eq!(
            EngineError::Rejected("bad codec".to_string()).to_string(),
            "engine rejected operation: bad codec"
        );
    }
}

//! In-process loopback media engine
//!
//! A self-contained [`MediaEngine`] that fabricates transport parameters
//! and tracks producer/consumer relationships without moving any media.
//! It drives the demos and the test suite, and doubles as a reference for
//! what a real router binding has to provide: honest close cascades,
//! producer bookkeeping for `can_consume`, and `source_closed` wiring
//! from producers to their consumers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::engine::{EngineError, MediaConsumer, MediaEngine, MediaProducer, MediaTransport};
use super::types::{
    DtlsParameters, IceCandidate, IceParameters, MediaKind, RtpCapabilities, RtpParameters,
    TransportParams,
};

/// Configuration for the loopback engine
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// IP announced in fabricated ICE candidates
    pub announced_ip: String,
    /// Lowest RTC port handed out in candidates
    pub rtc_min_port: u16,
    /// Highest RTC port handed out in candidates
    pub rtc_max_port: u16,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            announced_ip: "127.0.0.1".to_string(),
            rtc_min_port: 40000,
            rtc_max_port: 49999,
        }
    }
}

impl LoopbackConfig {
    /// Set the announced IP
    pub fn announced_ip(mut self, ip: impl Into<String>) -> Self {
        self.announced_ip = ip.into();
        self
    }

    /// Set the RTC port range
    pub fn port_range(mut self, min: u16, max: u16) -> Self {
        self.rtc_min_port = min;
        self.rtc_max_port = max;
        self
    }
}

/// What the engine remembers about a live producer
struct ProducerRecord {
    kind: MediaKind,
    rtp_parameters: RtpParameters,
    closed: CancellationToken,
}

/// State shared between the engine and its transports
struct LoopbackShared {
    config: LoopbackConfig,
    producers: RwLock<HashMap<String, ProducerRecord>>,
    next_port: AtomicU32,
}

impl LoopbackShared {
    fn allocate_port(&self) -> u16 {
        let span = self
            .config
            .rtc_max_port
            .saturating_sub(self.config.rtc_min_port) as u32
            + 1;
        let offset = self.next_port.fetch_add(1, Ordering::Relaxed) % span;
        self.config.rtc_min_port + offset as u16
    }
}

/// Loopback media engine
pub struct LoopbackEngine {
    capabilities: RtpCapabilities,
    shared: Arc<LoopbackShared>,
}

impl LoopbackEngine {
    /// Create a loopback engine with default configuration
    pub fn new() -> Self {
        Self::with_config(LoopbackConfig::default())
    }

    /// Create a loopback engine with custom configuration
    pub fn with_config(config: LoopbackConfig) -> Self {
        Self {
            capabilities: Self::default_capabilities(),
            shared: Arc::new(LoopbackShared {
                config,
                producers: RwLock::new(HashMap::new()),
                next_port: AtomicU32::new(0),
            }),
        }
    }

    /// Override the advertised router capabilities
    pub fn capabilities(mut self, capabilities: RtpCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Opus audio and VP8 video, the common browser baseline
    pub fn default_capabilities() -> RtpCapabilities {
        RtpCapabilities(json!({
            "codecs": [
                {
                    "kind": "audio",
                    "mimeType": "audio/opus",
                    "clockRate": 48000,
                    "channels": 2
                },
                {
                    "kind": "video",
                    "mimeType": "video/VP8",
                    "clockRate": 90000,
                    "parameters": {
                        "x-google-start-bitrate": 1000
                    }
                }
            ],
            "headerExtensions": []
        }))
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEngine for LoopbackEngine {
    fn rtp_capabilities(&self) -> RtpCapabilities {
        self.capabilities.clone()
    }

    async fn create_transport(&self) -> Result<Arc<dyn MediaTransport>, EngineError> {
        let transport = LoopbackTransport::new(Arc::clone(&self.shared));
        tracing::debug!(transport = %transport.id, "Loopback transport created");
        Ok(Arc::new(transport))
    }

    async fn can_consume(&self, producer_id: &str, rtp_capabilities: &RtpCapabilities) -> bool {
        let producers = self.shared.producers.read().await;

        match producers.get(producer_id) {
            Some(record) if !record.closed.is_cancelled() => {
                capabilities_cover(rtp_capabilities, record.kind)
            }
            _ => false,
        }
    }
}

/// Check that a capability set advertises at least one codec of the kind
fn capabilities_cover(capabilities: &RtpCapabilities, kind: MediaKind) -> bool {
    capabilities
        .0
        .get("codecs")
        .and_then(serde_json::Value::as_array)
        .map(|codecs| {
            codecs.iter().any(|codec| {
                codec
                    .get("mimeType")
                    .and_then(serde_json::Value::as_str)
                    .and_then(|mime| mime.split('/').next())
                    .map(|codec_kind| codec_kind.eq_ignore_ascii_case(kind.as_str()))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// Fabricated SHA-256 style fingerprint (random, colon-separated hex pairs)
fn fabricate_fingerprint() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .chain(Uuid::new_v4().as_bytes().iter())
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(":")
}

/// Loopback WebRTC transport
pub struct LoopbackTransport {
    id: String,
    params: TransportParams,
    shared: Arc<LoopbackShared>,
    connected: AtomicBool,
    closed: CancellationToken,
    producers: RwLock<Vec<Arc<LoopbackProducer>>>,
    consumers: RwLock<Vec<Arc<LoopbackConsumer>>>,
}

impl LoopbackTransport {
    fn new(shared: Arc<LoopbackShared>) -> Self {
        let id = Uuid::new_v4().to_string();
        let port = shared.allocate_port();

        let params = TransportParams {
            id: id.clone(),
            ice_parameters: IceParameters(json!({
                "usernameFragment": Uuid::new_v4().simple().to_string(),
                "password": Uuid::new_v4().simple().to_string(),
                "iceLite": true
            })),
            ice_candidates: vec![IceCandidate(json!({
                "foundation": "udpcandidate",
                "priority": 1076558079u32,
                "ip": shared.config.announced_ip,
                "protocol": "udp",
                "port": port,
                "type": "host"
            }))],
            dtls_parameters: DtlsParameters(json!({
                "role": "auto",
                "fingerprints": [
                    {
                        "algorithm": "sha-256",
                        "value": fabricate_fingerprint()
                    }
                ]
            })),
        };

        Self {
            id,
            params,
            shared,
            connected: AtomicBool::new(false),
            closed: CancellationToken::new(),
            producers: RwLock::new(Vec::new()),
            consumers: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaTransport for LoopbackTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn params(&self) -> TransportParams {
        self.params.clone()
    }

    async fn connect(&self, _dtls_parameters: DtlsParameters) -> Result<(), EngineError> {
        if self.closed.is_cancelled() {
            return Err(EngineError::Closed("transport"));
        }

        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(EngineError::Rejected(
                "transport already connected".to_string(),
            ));
        }

        Ok(())
    }

    async fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<Arc<dyn MediaProducer>, EngineError> {
        if self.closed.is_cancelled() {
            return Err(EngineError::Closed("transport"));
        }

        let producer = Arc::new(LoopbackProducer {
            id: Uuid::new_v4().to_string(),
            kind,
            closed: CancellationToken::new(),
            shared: Arc::clone(&self.shared),
        });

        let record = ProducerRecord {
            kind,
            rtp_parameters,
            closed: producer.closed.clone(),
        };
        self.shared
            .producers
            .write()
            .await
            .insert(producer.id.clone(), record);

        self.producers.write().await.push(Arc::clone(&producer));

        Ok(producer)
    }

    async fn consume(
        &self,
        producer_id: &str,
        rtp_capabilities: RtpCapabilities,
        paused: bool,
    ) -> Result<Arc<dyn MediaConsumer>, EngineError> {
        if self.closed.is_cancelled() {
            return Err(EngineError::Closed("transport"));
        }

        let producers = self.shared.producers.read().await;
        let record = producers
            .get(producer_id)
            .filter(|record| !record.closed.is_cancelled())
            .ok_or_else(|| EngineError::Rejected(format!("producer {} not found", producer_id)))?;

        if !capabilities_cover(&rtp_capabilities, record.kind) {
            return Err(EngineError::Rejected(
                "incompatible rtp capabilities".to_string(),
            ));
        }

        let consumer = Arc::new(LoopbackConsumer {
            id: Uuid::new_v4().to_string(),
            kind: record.kind,
            producer_id: producer_id.to_string(),
            rtp_parameters: record.rtp_parameters.clone(),
            paused: AtomicBool::new(paused),
            closed: CancellationToken::new(),
            source_closed: record.closed.clone(),
        });
        drop(producers);

        self.consumers.write().await.push(Arc::clone(&consumer));

        Ok(consumer)
    }

    async fn close(&self) {
        self.closed.cancel();

        let producers: Vec<_> = self.producers.write().await.drain(..).collect();
        for producer in producers {
            producer.close().await;
        }

        let consumers: Vec<_> = self.consumers.write().await.drain(..).collect();
        for consumer in consumers {
            consumer.close().await;
        }
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}

/// Loopback producer
pub struct LoopbackProducer {
    id: String,
    kind: MediaKind,
    closed: CancellationToken,
    shared: Arc<LoopbackShared>,
}

#[async_trait]
impl MediaProducer for LoopbackProducer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn close(&self) {
        self.closed.cancel();
        self.shared.producers.write().await.remove(&self.id);
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}

/// Loopback consumer
pub struct LoopbackConsumer {
    id: String,
    kind: MediaKind,
    producer_id: String,
    rtp_parameters: RtpParameters,
    paused: AtomicBool,
    closed: CancellationToken,
    source_closed: CancellationToken,
}

#[async_trait]
impl MediaConsumer for LoopbackConsumer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn producer_id(&self) -> &str {
        &self.producer_id
    }

    fn rtp_parameters(&self) -> RtpParameters {
        self.rtp_parameters.clone()
    }

    fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    async fn resume(&self) -> Result<(), EngineError> {
        if self.closed.is_cancelled() {
            return Err(EngineError::Closed("consumer"));
        }

        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.cancel();
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    fn source_closed(&self) -> CancellationToken {
        self.source_closed.clone()
    }
}

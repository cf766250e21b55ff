//! Per-peer request handling
//!
//! [`PeerSession`] owns one peer's view of the shared session state and
//! maps each protocol request onto the registry and the media engine.
//! Requests from a single peer are handled strictly in arrival order by
//! the connection loop; handlers only suspend on engine calls.

use std::sync::Arc;

use crate::media::engine::EngineGate;
use crate::media::types::{
    ConsumerParams, DtlsParameters, MediaKind, PeerId, RtpCapabilities, RtpParameters,
    TransportDirection,
};
use crate::protocol::error::SignalError;
use crate::protocol::message::{ClientRequest, ResponseData, ServerEvent};
use crate::registry::key::{ConsumerKey, ProducerKey, TransportKey};
use crate::registry::store::SessionRegistry;

use super::hub::PeerHub;
use super::lifecycle;

/// Wire name of the transport resource for error messages
fn transport_resource(direction: TransportDirection) -> &'static str {
    match direction {
        TransportDirection::Send => "producer transport",
        TransportDirection::Recv => "consumer transport",
    }
}

/// Handles one peer's requests against the shared session state
pub struct PeerSession {
    id: PeerId,
    engine: Arc<EngineGate>,
    registry: Arc<SessionRegistry>,
    hub: Arc<PeerHub>,
}

impl PeerSession {
    /// Create a session for a connected peer
    pub fn new(
        id: PeerId,
        engine: Arc<EngineGate>,
        registry: Arc<SessionRegistry>,
        hub: Arc<PeerHub>,
    ) -> Self {
        Self {
            id,
            engine,
            registry,
            hub,
        }
    }

    /// Id of the peer this session belongs to
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// Dispatch a request to its handler
    pub async fn handle(&self, request: ClientRequest) -> Result<ResponseData, SignalError> {
        match request {
            ClientRequest::GetRouterRtpCapabilities => self.router_rtp_capabilities().await,
            ClientRequest::CreateProducerTransport => {
                self.create_transport(TransportDirection::Send).await
            }
            ClientRequest::ConnectProducerTransport { dtls_parameters } => {
                self.connect_transport(TransportDirection::Send, dtls_parameters)
                    .await
            }
            ClientRequest::Produce {
                kind,
                rtp_parameters,
            } => self.produce(kind, rtp_parameters).await,
            ClientRequest::CreateConsumerTransport => {
                self.create_transport(TransportDirection::Recv).await
            }
            ClientRequest::ConnectConsumerTransport { dtls_parameters } => {
                self.connect_transport(TransportDirection::Recv, dtls_parameters)
                    .await
            }
            ClientRequest::GetCurrentProducers { local_id } => {
                self.current_producers(local_id).await
            }
            ClientRequest::ConsumeAdd {
                rtp_capabilities,
                remote_id,
                kind,
            } => self.consume_add(rtp_capabilities, remote_id, kind).await,
            ClientRequest::ResumeAdd { remote_id, kind } => {
                self.resume_add(remote_id, kind).await
            }
        }
    }

    async fn router_rtp_capabilities(&self) -> Result<ResponseData, SignalError> {
        let engine = self.engine.get().ok_or(SignalError::NotReady)?;
        Ok(ResponseData::RouterRtpCapabilities(engine.rtp_capabilities()))
    }

    async fn create_transport(
        &self,
        direction: TransportDirection,
    ) -> Result<ResponseData, SignalError> {
        let engine = self.engine.get().ok_or(SignalError::NotReady)?;
        let transport = engine.create_transport().await?;
        let params = transport.params();

        let key = TransportKey::new(self.id.clone(), direction);
        if let Some(displaced) = self
            .registry
            .insert_transport(key, Arc::clone(&transport))
            .await
        {
            tracing::warn!(
                peer = %self.id,
                direction = %direction,
                replaced = displaced.id(),
                "Duplicate transport request, retiring previous"
            );
            lifecycle::retire_transport(&self.registry, &self.id, direction, displaced).await;
        }

        lifecycle::watch_transport(
            Arc::clone(&self.registry),
            self.id.clone(),
            direction,
            transport,
        );

        tracing::info!(
            peer = %self.id,
            direction = %direction,
            transport = %params.id,
            "Transport created"
        );
        Ok(ResponseData::Transport(params))
    }

    async fn connect_transport(
        &self,
        direction: TransportDirection,
        dtls_parameters: DtlsParameters,
    ) -> Result<ResponseData, SignalError> {
        let key = TransportKey::new(self.id.clone(), direction);
        let transport =
            self.registry
                .get_transport(&key)
                .await
                .ok_or_else(|| SignalError::NotFound {
                    resource: transport_resource(direction),
                    id: self.id.to_string(),
                })?;

        transport.connect(dtls_parameters).await?;

        tracing::debug!(peer = %self.id, direction = %direction, "Transport connected");
        Ok(ResponseData::Ack {})
    }

    async fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ResponseData, SignalError> {
        let key = TransportKey::send(self.id.clone());
        let transport =
            self.registry
                .get_transport(&key)
                .await
                .ok_or_else(|| SignalError::NotFound {
                    resource: transport_resource(TransportDirection::Send),
                    id: self.id.to_string(),
                })?;

        let producer = transport.produce(kind, rtp_parameters).await?;
        let producer_id = producer.id().to_string();
        let kind = producer.kind();

        if let Some(displaced) = self
            .registry
            .insert_producer(ProducerKey::new(self.id.clone(), kind), producer)
            .await
        {
            tracing::warn!(
                peer = %self.id,
                kind = %kind,
                replaced = displaced.id(),
                "Duplicate producer, closing previous"
            );
            displaced.close().await;
        }

        let notified = self
            .hub
            .broadcast_except(
                &self.id,
                ServerEvent::NewProducer {
                    socket_id: self.id.clone(),
                    producer_id: producer_id.clone(),
                    kind,
                },
            )
            .await;

        tracing::info!(
            peer = %self.id,
            kind = %kind,
            producer = %producer_id,
            notified,
            "Producer created"
        );
        Ok(ResponseData::Produced { id: producer_id })
    }

    async fn current_producers(&self, local_id: PeerId) -> Result<ResponseData, SignalError> {
        let remote_video_ids = self
            .registry
            .remote_producer_peers(&local_id, MediaKind::Video)
            .await;
        let remote_audio_ids = self
            .registry
            .remote_producer_peers(&local_id, MediaKind::Audio)
            .await;

        tracing::debug!(
            peer = %self.id,
            video = remote_video_ids.len(),
            audio = remote_audio_ids.len(),
            "Listed current producers"
        );
        Ok(ResponseData::CurrentProducers {
            remote_video_ids,
            remote_audio_ids,
        })
    }

    async fn consume_add(
        &self,
        rtp_capabilities: RtpCapabilities,
        remote_id: PeerId,
        kind: MediaKind,
    ) -> Result<ResponseData, SignalError> {
        let engine = self.engine.get().ok_or(SignalError::NotReady)?;

        let transport_key = TransportKey::recv(self.id.clone());
        let transport = self
            .registry
            .get_transport(&transport_key)
            .await
            .ok_or_else(|| SignalError::NotFound {
                resource: transport_resource(TransportDirection::Recv),
                id: self.id.to_string(),
            })?;

        let producer_key = ProducerKey::new(remote_id.clone(), kind);
        let producer = self
            .registry
            .get_producer(&producer_key)
            .await
            .ok_or_else(|| SignalError::NotFound {
                resource: "producer",
                id: producer_key.to_string(),
            })?;

        if !engine.can_consume(producer.id(), &rtp_capabilities).await {
            return Err(SignalError::CannotConsume { remote_id, kind });
        }

        // Video consumers start paused and wait for resumeAdd, so the
        // first keyframe is not sent into a track the client has not
        // wired up yet. Audio flows immediately.
        let paused = kind == MediaKind::Video;
        let consumer = transport
            .consume(producer.id(), rtp_capabilities, paused)
            .await?;

        let params = ConsumerParams {
            producer_id: producer.id().to_string(),
            id: consumer.id().to_string(),
            kind: consumer.kind(),
            rtp_parameters: consumer.rtp_parameters(),
            paused: consumer.paused(),
        };

        let key = ConsumerKey::new(self.id.clone(), remote_id.clone(), kind);
        if let Some(displaced) = self
            .registry
            .insert_consumer(key.clone(), Arc::clone(&consumer))
            .await
        {
            tracing::warn!(consumer = %key, replaced = displaced.id(), "Duplicate consumer, closing previous");
            displaced.close().await;
        }

        lifecycle::watch_consumer(
            Arc::clone(&self.registry),
            Arc::clone(&self.hub),
            key,
            consumer,
        );

        tracing::info!(
            peer = %self.id,
            remote = %remote_id,
            kind = %kind,
            consumer = %params.id,
            "Consumer created"
        );
        Ok(ResponseData::Consumer(params))
    }

    async fn resume_add(
        &self,
        remote_id: PeerId,
        kind: MediaKind,
    ) -> Result<ResponseData, SignalError> {
        let key = ConsumerKey::new(self.id.clone(), remote_id, kind);
        let consumer = self
            .registry
            .get_consumer(&key)
            .await
            .ok_or_else(|| SignalError::NotFound {
                resource: "consumer",
                id: key.to_string(),
            })?;

        consumer.resume().await?;

        tracing::debug!(consumer = %key, "Consumer resumed");
        Ok(ResponseData::Ack {})
    }

    /// Tear down everything this peer owns and leave the hub
    ///
    /// Called when the connection ends, for whatever reason. Idempotent.
    pub async fn disconnect(&self) {
        self.hub.detach(&self.id).await;
        lifecycle::cleanup_peer(&self.registry, &self.id).await;
        tracing::info!(peer = %self.id, "Peer disconnected");
    }
}

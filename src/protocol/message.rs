//! Wire message types for the signaling protocol
//!
//! Requests are tagged by `method` with their arguments under `data`,
//! matching what the browser client sends. Server pushes use the same
//! shape with `event` instead of `method`. Field names are camelCase on
//! the wire.

use serde::{Deserialize, Serialize};

use crate::media::types::{
    ConsumerParams, DtlsParameters, MediaKind, PeerId, RtpCapabilities, RtpParameters,
    TransportParams,
};

/// A request sent by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    /// Fetch the router's RTP capability set
    GetRouterRtpCapabilities,

    /// Create the peer's send transport
    CreateProducerTransport,

    /// Finish DTLS setup of the send transport
    ConnectProducerTransport { dtls_parameters: DtlsParameters },

    /// Start producing media on the send transport
    Produce {
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },

    /// Create the peer's recv transport
    CreateConsumerTransport,

    /// Finish DTLS setup of the recv transport
    ConnectConsumerTransport { dtls_parameters: DtlsParameters },

    /// List the peers currently producing, split by kind
    GetCurrentProducers { local_id: PeerId },

    /// Start consuming a remote peer's producer
    ConsumeAdd {
        rtp_capabilities: RtpCapabilities,
        remote_id: PeerId,
        kind: MediaKind,
    },

    /// Resume a consumer that was created paused
    ResumeAdd { remote_id: PeerId, kind: MediaKind },
}

impl ClientRequest {
    /// Wire name of the method, for logging
    pub fn method(&self) -> &'static str {
        match self {
            ClientRequest::GetRouterRtpCapabilities => "getRouterRtpCapabilities",
            ClientRequest::CreateProducerTransport => "createProducerTransport",
            ClientRequest::ConnectProducerTransport { .. } => "connectProducerTransport",
            ClientRequest::Produce { .. } => "produce",
            ClientRequest::CreateConsumerTransport => "createConsumerTransport",
            ClientRequest::ConnectConsumerTransport { .. } => "connectConsumerTransport",
            ClientRequest::GetCurrentProducers { .. } => "getCurrentProducers",
            ClientRequest::ConsumeAdd { .. } => "consumeAdd",
            ClientRequest::ResumeAdd { .. } => "resumeAdd",
        }
    }
}

/// Payload of a successful reply
///
/// Serialized untagged: the payload shape alone identifies it, and the
/// client knows which request it belongs to via the correlation id.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ResponseData {
    /// Router capability set (`getRouterRtpCapabilities`)
    RouterRtpCapabilities(RtpCapabilities),

    /// Transport connection parameters (`createProducerTransport`,
    /// `createConsumerTransport`)
    Transport(TransportParams),

    /// Engine id of the new producer (`produce`)
    Produced { id: String },

    /// Producing peers split by kind (`getCurrentProducers`)
    CurrentProducers {
        remote_video_ids: Vec<PeerId>,
        remote_audio_ids: Vec<PeerId>,
    },

    /// Consumer connection parameters (`consumeAdd`)
    Consumer(ConsumerParams),

    /// Empty acknowledgement (`connect*Transport`, `resumeAdd`)
    Ack {},
}

/// A push sent by the server outside the request/reply cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Server-assigned peer id, sent once when the socket connects
    Welcome { id: PeerId },

    /// A peer started producing; consumers may now subscribe
    NewProducer {
        socket_id: PeerId,
        producer_id: String,
        kind: MediaKind,
    },

    /// A producer this peer consumes went away
    ProducerClosed {
        local_id: PeerId,
        remote_id: PeerId,
        kind: MediaKind,
    },
}

impl ServerEvent {
    /// Wire name of the event, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Welcome { .. } => "welcome",
            ServerEvent::NewProducer { .. } => "newProducer",
            ServerEvent::ProducerClosed { .. } => "producerClosed",
        }
    }
}

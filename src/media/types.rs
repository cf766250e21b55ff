//! Core media vocabulary shared across the signaling crate
//!
//! Peers, media kinds and the opaque parameter blobs that travel between
//! the browser client and the media engine. The server never interprets
//! RTP/ICE/DTLS payloads beyond routing them, so they are carried as
//! raw JSON values.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connected peer
///
/// Assigned by the server when the socket connects and announced to the
/// client in the `welcome` push. Also used on the wire as `remoteId` to
/// address another peer's producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer id from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random peer id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// View the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Kind of media carried by a producer or consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl MediaKind {
    /// Wire name of the kind ("audio" or "video")
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a WebRTC transport relative to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportDirection {
    /// Peer sends media to the server (producer side)
    Send,
    /// Peer receives media from the server (consumer side)
    Recv,
}

impl TransportDirection {
    /// Short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportDirection::Send => "send",
            TransportDirection::Recv => "recv",
        }
    }
}

impl std::fmt::Display for TransportDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router RTP capability set, passed to clients verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RtpCapabilities(pub serde_json::Value);

/// RTP send/receive parameters, passed through to the engine verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RtpParameters(pub serde_json::Value);

/// DTLS handshake parameters from the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DtlsParameters(pub serde_json::Value);

/// ICE parameters generated by the engine for a transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IceParameters(pub serde_json::Value);

/// A single ICE candidate generated by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IceCandidate(pub serde_json::Value);

/// Connection parameters for a freshly created transport
///
/// Returned to the client from `createProducerTransport` and
/// `createConsumerTransport` so it can mirror the transport locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportParams {
    /// Engine-assigned transport id
    pub id: String,
    /// ICE parameters for the client side of the handshake
    pub ice_parameters: IceParameters,
    /// ICE candidates the client should try
    pub ice_candidates: Vec<IceCandidate>,
    /// DTLS parameters for the client side of the handshake
    pub dtls_parameters: DtlsParameters,
}

/// Connection parameters for a freshly created consumer
///
/// Returned to the client from `consumeAdd`. `paused` reflects the
/// initial engine-side state; video consumers start paused until the
/// client acknowledges with `resumeAdd`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerParams {
    /// Engine id of the producer being consumed
    pub producer_id: String,
    /// Engine id of the consumer
    pub id: String,
    /// Media kind of the consumed track
    pub kind: MediaKind,
    /// RTP parameters the client needs to receive the track
    pub rtp_parameters: RtpParameters,
    /// Whether the consumer starts paused
    pub paused: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_peer_id_transparent_serde() {
        let id = PeerId::new("peer-1");
        let encoded = serde_json::to_string(&id).unwrap();
        assert_eq!(encoded, "\"peer-1\"");

        let decoded: PeerId = serde_json::from_str("\"peer-2\"").unwrap();
        assert_eq!(decoded.as_str(), "peer-2");
    }

    #[test]
    fn test_peer_id_generate_unique() {
        let a = PeerId::generate();
        let b = PeerId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_media_kind_wire_names() {
        assert_eq!(serde_json::to_string(&MediaKind::Audio).unwrap(), "\"audio\"");
        assert_eq!(serde_json::to_string(&MediaKind::Video).unwrap(), "\"video\"");

        let kind: MediaKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(kind, MediaKind::Video);
    }

    #[test]
    fn test_transport_params_camel_case() {
        let params = TransportParams {
            id: "t1".to_string(),
            ice_parameters: IceParameters(json!({"usernameFragment": "u"})),
            ice_candidates: vec![IceCandidate(json!({"port": 40000}))],
            dtls_parameters: DtlsParameters(json!({"role": "auto"})),
        };

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["id"], "t1");
        assert!(value.get("iceParameters").is_some());
        assert!(value.get("iceCandidates").is_some());
        assert!(value.get("dtlsParameters").is_some());
    }

    #[test]
    fn test_consumer_params_camel_case() {
        let params = ConsumerParams {
            producer_id: "p1".to_string(),
            id: "c1".to_string(),
            kind: MediaKind::Video,
            rtp_parameters: RtpParameters(json!({"codecs": []})),
            paused: true,
        };

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["producerId"], "p1");
        assert_eq!(value["id"], "c1");
        assert_eq!(value["kind"], "video");
        assert_eq!(value["paused"], true);
        assert!(value.get("rtpParameters").is_some());
    }
}

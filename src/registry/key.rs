//! Registry key types
//!
//! Composite keys that encode the per-peer cardinality rules directly in
//! the map structure: one transport per (peer, direction), one producer
//! per (peer, kind), one consumer per (local peer, remote peer, kind).
//! Inserting at an occupied key therefore always means replacement.

use crate::media::types::{MediaKind, PeerId, TransportDirection};

/// Key for a transport entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportKey {
    /// Peer that owns the transport
    pub peer: PeerId,
    /// Direction of the transport
    pub direction: TransportDirection,
}

impl TransportKey {
    /// Create a new transport key
    pub fn new(peer: PeerId, direction: TransportDirection) -> Self {
        Self { peer, direction }
    }

    /// Key for a peer's send (producer-side) transport
    pub fn send(peer: PeerId) -> Self {
        Self::new(peer, TransportDirection::Send)
    }

    /// Key for a peer's recv (consumer-side) transport
    pub fn recv(peer: PeerId) -> Self {
        Self::new(peer, TransportDirection::Recv)
    }
}

impl std::fmt::Display for TransportKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.peer, self.direction)
    }
}

/// Key for a producer entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProducerKey {
    /// Peer that owns the producer
    pub peer: PeerId,
    /// Kind of media produced
    pub kind: MediaKind,
}

impl ProducerKey {
    /// Create a new producer key
    pub fn new(peer: PeerId, kind: MediaKind) -> Self {
        Self { peer, kind }
    }
}

impl std::fmt::Display for ProducerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.peer, self.kind)
    }
}

/// Key for a consumer entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumerKey {
    /// Peer that owns the consumer and receives the media
    pub local: PeerId,
    /// Peer whose producer is being consumed
    pub remote: PeerId,
    /// Kind of media consumed
    pub kind: MediaKind,
}

impl ConsumerKey {
    /// Create a new consumer key
    pub fn new(local: PeerId, remote: PeerId, kind: MediaKind) -> Self {
        Self {
            local,
            remote,
            kind,
        }
    }
}

impl std::fmt::Display for ConsumerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<-{}/{}", self.local, self.remote, self.kind)
    }
}

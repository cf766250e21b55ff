//! Connected-peer directory and push fan-out
//!
//! Each connection registers an event channel here on attach. Request
//! handlers and close observers push [`ServerEvent`]s through the hub;
//! the owning connection's write loop drains them onto the socket.
//! Pushing to a departed peer is dropped and logged, never an error.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};

use crate::media::types::PeerId;
use crate::protocol::message::ServerEvent;

/// Directory of connected peers and their push channels
pub struct PeerHub {
    peers: RwLock<HashMap<PeerId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl PeerHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a peer and return the receiving end of its event channel
    pub async fn attach(&self, peer: PeerId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        if self.peers.write().await.insert(peer.clone(), tx).is_some() {
            // Peer ids are generated per connection, so this indicates a
            // stale entry; the replaced sender unblocks its old receiver.
            tracing::warn!(peer = %peer, "Replacing existing hub registration");
        }

        tracing::debug!(peer = %peer, "Peer attached");
        rx
    }

    /// Remove a peer from the directory
    pub async fn detach(&self, peer: &PeerId) {
        if self.peers.write().await.remove(peer).is_some() {
            tracing::debug!(peer = %peer, "Peer detached");
        }
    }

    /// Push an event to a single peer
    ///
    /// Returns `false` if the peer is gone or its connection is draining.
    pub async fn send_to(&self, peer: &PeerId, event: ServerEvent) -> bool {
        let peers = self.peers.read().await;

        match peers.get(peer) {
            Some(tx) => match tx.send(event) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(peer = %peer, event = e.0.name(), "Push dropped: connection draining");
                    false
                }
            },
            None => {
                tracing::debug!(peer = %peer, event = event.name(), "Push dropped: peer gone");
                false
            }
        }
    }

    /// Push an event to every peer except one, returning the delivery count
    pub async fn broadcast_except(&self, exclude: &PeerId, event: ServerEvent) -> usize {
        let peers = self.peers.read().await;

        let mut delivered = 0;
        for (peer, tx) in peers.iter() {
            if peer == exclude {
                continue;
            }
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(event = event.name(), delivered, "Broadcast");
        delivered
    }

    /// Number of attached peers
    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}

impl Default for PeerHub {
    fn default() -> Self {
        Self::new()
    }
}

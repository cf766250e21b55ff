//! Session registry implementation
//!
//! The central registry that tracks every live transport, producer and
//! consumer, keyed by owning peer. Handlers look resources up here, and
//! peer cleanup drains everything a departing peer owned.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::media::engine::{MediaConsumer, MediaProducer, MediaTransport};
use crate::media::types::{MediaKind, PeerId};

use super::key::{ConsumerKey, ProducerKey, TransportKey};

/// Central registry for all live session resources
///
/// Thread-safe via `RwLock` per resource class. All operations are plain
/// map lookups and never call into the media engine; closing evicted
/// objects is the caller's responsibility. Removing an absent entry is a
/// no-op, and inserting at an occupied key returns the displaced entry.
pub struct SessionRegistry {
    /// One transport per (peer, direction)
    transports: RwLock<HashMap<TransportKey, Arc<dyn MediaTransport>>>,

    /// One producer per (peer, kind)
    producers: RwLock<HashMap<ProducerKey, Arc<dyn MediaProducer>>>,

    /// One consumer per (local peer, remote peer, kind)
    consumers: RwLock<HashMap<ConsumerKey, Arc<dyn MediaConsumer>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            transports: RwLock::new(HashMap::new()),
            producers: RwLock::new(HashMap::new()),
            consumers: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a transport, returning the displaced entry if the slot was taken
    pub async fn insert_transport(
        &self,
        key: TransportKey,
        transport: Arc<dyn MediaTransport>,
    ) -> Option<Arc<dyn MediaTransport>> {
        tracing::debug!(transport = %key, id = transport.id(), "Transport registered");
        self.transports.write().await.insert(key, transport)
    }

    /// Look up a peer's transport
    pub async fn get_transport(&self, key: &TransportKey) -> Option<Arc<dyn MediaTransport>> {
        self.transports.read().await.get(key).cloned()
    }

    /// Remove a peer's transport
    pub async fn remove_transport(&self, key: &TransportKey) -> Option<Arc<dyn MediaTransport>> {
        self.transports.write().await.remove(key)
    }

    /// Remove a peer's transport only if it is still the given instance
    ///
    /// Used by close observers so that a watcher for a replaced transport
    /// cannot evict its successor.
    pub async fn remove_transport_if(
        &self,
        key: &TransportKey,
        transport_id: &str,
    ) -> Option<Arc<dyn MediaTransport>> {
        let mut transports = self.transports.write().await;

        match transports.get(key) {
            Some(current) if current.id() == transport_id => transports.remove(key),
            _ => None,
        }
    }

    /// Insert a producer, returning the displaced entry if the slot was taken
    pub async fn insert_producer(
        &self,
        key: ProducerKey,
        producer: Arc<dyn MediaProducer>,
    ) -> Option<Arc<dyn MediaProducer>> {
        tracing::debug!(producer = %key, id = producer.id(), "Producer registered");
        self.producers.write().await.insert(key, producer)
    }

    /// Look up a producer
    pub async fn get_producer(&self, key: &ProducerKey) -> Option<Arc<dyn MediaProducer>> {
        self.producers.read().await.get(key).cloned()
    }

    /// Remove a producer
    pub async fn remove_producer(&self, key: &ProducerKey) -> Option<Arc<dyn MediaProducer>> {
        self.producers.write().await.remove(key)
    }

    /// Peers other than `local` that currently produce the given kind
    pub async fn remote_producer_peers(&self, local: &PeerId, kind: MediaKind) -> Vec<PeerId> {
        self.producers
            .read()
            .await
            .keys()
            .filter(|key| key.kind == kind && key.peer != *local)
            .map(|key| key.peer.clone())
            .collect()
    }

    /// Insert a consumer, returning the displaced entry if the slot was taken
    pub async fn insert_consumer(
        &self,
        key: ConsumerKey,
        consumer: Arc<dyn MediaConsumer>,
    ) -> Option<Arc<dyn MediaConsumer>> {
        tracing::debug!(consumer = %key, id = consumer.id(), "Consumer registered");
        self.consumers.write().await.insert(key, consumer)
    }

    /// Look up a consumer
    pub async fn get_consumer(&self, key: &ConsumerKey) -> Option<Arc<dyn MediaConsumer>> {
        self.consumers.read().await.get(key).cloned()
    }

    /// Remove a consumer only if it is still the given instance
    ///
    /// Used by close observers so that a watcher for a replaced consumer
    /// cannot evict its successor.
    pub async fn remove_consumer_if(
        &self,
        key: &ConsumerKey,
        consumer_id: &str,
    ) -> Option<Arc<dyn MediaConsumer>> {
        let mut consumers = self.consumers.write().await;

        match consumers.get(key) {
            Some(current) if current.id() == consumer_id => consumers.remove(key),
            _ => None,
        }
    }

    /// Remove every consumer owned by a peer, returning the drained entries
    pub async fn remove_peer_consumers(&self, peer: &PeerId) -> Vec<Arc<dyn MediaConsumer>> {
        let mut consumers = self.consumers.write().await;

        let keys: Vec<ConsumerKey> = consumers
            .keys()
            .filter(|key| key.local == *peer)
            .cloned()
            .collect();

        keys.iter()
            .filter_map(|key| consumers.remove(key))
            .collect()
    }

    /// Total number of entries owned by a peer across all three maps
    pub async fn peer_entry_count(&self, peer: &PeerId) -> usize {
        let transports = self
            .transports
            .read()
            .await
            .keys()
            .filter(|key| key.peer == *peer)
            .count();
        let producers = self
            .producers
            .read()
            .await
            .keys()
            .filter(|key| key.peer == *peer)
            .count();
        let consumers = self
            .consumers
            .read()
            .await
            .keys()
            .filter(|key| key.local == *peer)
            .count();

        transports + producers + consumers
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::media::engine::MediaEngine;
    use crate::media::loopback::LoopbackEngine;
    use crate::media::types::RtpParameters;

    async fn transport(engine: &LoopbackEngine) -> Arc<dyn MediaTransport> {
        engine.create_transport().await.unwrap()
    }

    async fn producer(engine: &LoopbackEngine, kind: MediaKind) -> Arc<dyn MediaProducer> {
        transport(engine)
            .await
            .produce(kind, RtpParameters(json!({"codecs": []})))
            .await
            .unwrap()
    }

    async fn consumer(
        engine: &LoopbackEngine,
        source: &Arc<dyn MediaProducer>,
    ) -> Arc<dyn MediaConsumer> {
        transport(engine)
            .await
            .consume(
                source.id(),
                LoopbackEngine::default_capabilities(),
                false,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_transport_insert_get_remove() {
        let engine = LoopbackEngine::new();
        let registry = SessionRegistry::new();
        let key = TransportKey::send(PeerId::new("a"));

        assert!(registry.get_transport(&key).await.is_none());

        let t = transport(&engine).await;
        assert!(registry.insert_transport(key.clone(), t.clone()).await.is_none());

        let found = registry.get_transport(&key).await.unwrap();
        assert_eq!(found.id(), t.id());

        assert!(registry.remove_transport(&key).await.is_some());
        assert!(registry.remove_transport(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_transport_insert_displaces() {
        let engine = LoopbackEngine::new();
        let registry = SessionRegistry::new();
        let key = TransportKey::send(PeerId::new("a"));

        let first = transport(&engine).await;
        let second = transport(&engine).await;

        registry.insert_transport(key.clone(), first.clone()).await;
        let displaced = registry.insert_transport(key.clone(), second.clone()).await;

        assert_eq!(displaced.unwrap().id(), first.id());
        assert_eq!(registry.get_transport(&key).await.unwrap().id(), second.id());
    }

    #[tokio::test]
    async fn test_remove_transport_if_guards_identity() {
        let engine = LoopbackEngine::new();
        let registry = SessionRegistry::new();
        let key = TransportKey::recv(PeerId::new("a"));

        let current = transport(&engine).await;
        registry.insert_transport(key.clone(), current.clone()).await;

        // A stale watcher with a different id must not evict the entry
        assert!(registry.remove_transport_if(&key, "stale-id").await.is_none());
        assert!(registry.get_transport(&key).await.is_some());

        assert!(registry
            .remove_transport_if(&key, current.id())
            .await
            .is_some());
        assert!(registry.get_transport(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_producer_one_per_kind() {
        let engine = LoopbackEngine::new();
        let registry = SessionRegistry::new();
        let peer = PeerId::new("a");

        let video = producer(&engine, MediaKind::Video).await;
        let audio = producer(&engine, MediaKind::Audio).await;

        registry
            .insert_producer(ProducerKey::new(peer.clone(), MediaKind::Video), video)
            .await;
        registry
            .insert_producer(ProducerKey::new(peer.clone(), MediaKind::Audio), audio)
            .await;

        // Different kinds occupy different slots
        assert_eq!(registry.peer_entry_count(&peer).await, 2);

        // Same kind displaces
        let replacement = producer(&engine, MediaKind::Video).await;
        let displaced = registry
            .insert_producer(
                ProducerKey::new(peer.clone(), MediaKind::Video),
                replacement,
            )
            .await;
        assert!(displaced.is_some());
        assert_eq!(registry.peer_entry_count(&peer).await, 2);
    }

    #[tokio::test]
    async fn test_remote_producer_peers_excludes_local() {
        let engine = LoopbackEngine::new();
        let registry = SessionRegistry::new();

        let a = PeerId::new("a");
        let b = PeerId::new("b");
        let c = PeerId::new("c");

        registry
            .insert_producer(
                ProducerKey::new(a.clone(), MediaKind::Video),
                producer(&engine, MediaKind::Video).await,
            )
            .await;
        registry
            .insert_producer(
                ProducerKey::new(b.clone(), MediaKind::Video),
                producer(&engine, MediaKind::Video).await,
            )
            .await;
        registry
            .insert_producer(
                ProducerKey::new(c.clone(), MediaKind::Audio),
                producer(&engine, MediaKind::Audio).await,
            )
            .await;

        let mut video_peers = registry.remote_producer_peers(&a, MediaKind::Video).await;
        video_peers.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(video_peers, vec![b.clone()]);

        let audio_peers = registry.remote_producer_peers(&a, MediaKind::Audio).await;
        assert_eq!(audio_peers, vec![c]);

        // A peer that produces nothing sees everyone
        let mut all_video = registry
            .remote_producer_peers(&PeerId::new("z"), MediaKind::Video)
            .await;
        all_video.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(all_video, vec![a, b]);
    }

    #[tokio::test]
    async fn test_remove_consumer_if_guards_identity() {
        let engine = LoopbackEngine::new();
        let registry = SessionRegistry::new();

        let source = producer(&engine, MediaKind::Video).await;
        let first = consumer(&engine, &source).await;
        let second = consumer(&engine, &source).await;

        let key = ConsumerKey::new(PeerId::new("b"), PeerId::new("a"), MediaKind::Video);
        registry.insert_consumer(key.clone(), first.clone()).await;
        registry.insert_consumer(key.clone(), second.clone()).await;

        // The replaced consumer's watcher must not evict the replacement
        assert!(registry.remove_consumer_if(&key, first.id()).await.is_none());
        assert!(registry.get_consumer(&key).await.is_some());

        assert!(registry
            .remove_consumer_if(&key, second.id())
            .await
            .is_some());
        assert!(registry.get_consumer(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_peer_consumers_drains_one_peer() {
        let engine = LoopbackEngine::new();
        let registry = SessionRegistry::new();

        let a = PeerId::new("a");
        let b = PeerId::new("b");
        let c = PeerId::new("c");

        let source = producer(&engine, MediaKind::Video).await;

        registry
            .insert_consumer(
                ConsumerKey::new(b.clone(), a.clone(), MediaKind::Video),
                consumer(&engine, &source).await,
            )
            .await;
        registry
            .insert_consumer(
                ConsumerKey::new(b.clone(), c.clone(), MediaKind::Audio),
                consumer(&engine, &source).await,
            )
            .await;
        registry
            .insert_consumer(
                ConsumerKey::new(c.clone(), a.clone(), MediaKind::Video),
                consumer(&engine, &source).await,
            )
            .await;

        let drained = registry.remove_peer_consumers(&b).await;
        assert_eq!(drained.len(), 2);
        assert_eq!(registry.peer_entry_count(&b).await, 0);

        // Other peers are untouched
        assert_eq!(registry.peer_entry_count(&c).await, 1);

        // Draining again is a no-op
        assert!(registry.remove_peer_consumers(&b).await.is_empty());
    }
}

//! Close observers and peer teardown
//!
//! Every transport and consumer registered in the session registry gets
//! a spawned observer on its engine close token. The observers keep the
//! registry honest when the engine closes something unilaterally (ICE
//! failure, router shutdown) and drive the `producerClosed` push when a
//! consumed producer goes away.

use std::sync::Arc;

use crate::media::engine::{MediaConsumer, MediaTransport};
use crate::media::types::{MediaKind, PeerId, TransportDirection};
use crate::protocol::message::ServerEvent;
use crate::registry::key::{ConsumerKey, ProducerKey, TransportKey};
use crate::registry::store::SessionRegistry;

use super::hub::PeerHub;

/// Spawn the close observer for a registered transport
///
/// When the transport's close token fires, the observer evicts the entry
/// and closes everything that lived on the transport. The eviction is
/// identity-guarded: if the entry was already replaced or removed, the
/// path that did so owns the cleanup and the observer backs off.
pub(crate) fn watch_transport(
    registry: Arc<SessionRegistry>,
    peer: PeerId,
    direction: TransportDirection,
    transport: Arc<dyn MediaTransport>,
) {
    let closed = transport.closed();
    let transport_id = transport.id().to_string();

    tokio::spawn(async move {
        closed.cancelled().await;

        let key = TransportKey::new(peer.clone(), direction);
        if registry
            .remove_transport_if(&key, &transport_id)
            .await
            .is_none()
        {
            return;
        }

        tracing::debug!(transport = %key, "Transport closed engine-side, releasing dependents");
        close_transport_dependents(&registry, &peer, direction).await;
    });
}

/// Close everything that lived on a peer's transport of the given direction
async fn close_transport_dependents(
    registry: &SessionRegistry,
    peer: &PeerId,
    direction: TransportDirection,
) {
    match direction {
        TransportDirection::Send => {
            for kind in [MediaKind::Video, MediaKind::Audio] {
                let key = ProducerKey::new(peer.clone(), kind);
                if let Some(producer) = registry.remove_producer(&key).await {
                    producer.close().await;
                }
            }
        }
        TransportDirection::Recv => {
            for consumer in registry.remove_peer_consumers(peer).await {
                consumer.close().await;
            }
        }
    }
}

/// Close a displaced transport together with everything it owned
///
/// Used when a duplicate create request replaces a live transport. The
/// dependents are drained from the registry before the transport closes,
/// so the displaced transport's observer finds nothing left to do.
pub(crate) async fn retire_transport(
    registry: &SessionRegistry,
    peer: &PeerId,
    direction: TransportDirection,
    transport: Arc<dyn MediaTransport>,
) {
    close_transport_dependents(registry, peer, direction).await;
    transport.close().await;
}

/// Spawn the close observer for a registered consumer
///
/// If the bound producer closes first, the consumer is closed, evicted
/// (identity-guarded) and its owner notified with `producerClosed`. If
/// the consumer itself closes first there is nothing to announce.
pub(crate) fn watch_consumer(
    registry: Arc<SessionRegistry>,
    hub: Arc<PeerHub>,
    key: ConsumerKey,
    consumer: Arc<dyn MediaConsumer>,
) {
    let closed = consumer.closed();
    let source_closed = consumer.source_closed();
    let consumer_id = consumer.id().to_string();

    tokio::spawn(async move {
        tokio::select! {
            _ = source_closed.cancelled() => {
                consumer.close().await;
                registry.remove_consumer_if(&key, &consumer_id).await;

                let delivered = hub
                    .send_to(
                        &key.local,
                        ServerEvent::ProducerClosed {
                            local_id: key.local.clone(),
                            remote_id: key.remote.clone(),
                            kind: key.kind,
                        },
                    )
                    .await;

                tracing::debug!(consumer = %key, delivered, "Source producer closed, consumer retired");
            }
            _ = closed.cancelled() => {}
        }
    });
}

/// Release every resource a departing peer owns
///
/// Runs the teardown in dependency order: consumers, then the recv
/// transport, then producers (video before audio), then the send
/// transport. Producer closes fan out `producerClosed` to subscribed
/// peers through their consumer observers. Safe to call more than once.
pub(crate) async fn cleanup_peer(registry: &SessionRegistry, peer: &PeerId) {
    let consumers = registry.remove_peer_consumers(peer).await;
    let consumer_count = consumers.len();
    for consumer in consumers {
        consumer.close().await;
    }

    if let Some(transport) = registry.remove_transport(&TransportKey::recv(peer.clone())).await {
        transport.close().await;
    }

    for kind in [MediaKind::Video, MediaKind::Audio] {
        let key = ProducerKey::new(peer.clone(), kind);
        if let Some(producer) = registry.remove_producer(&key).await {
            producer.close().await;
        }
    }

    if let Some(transport) = registry.remove_transport(&TransportKey::send(peer.clone())).await {
        transport.close().await;
    }

    tracing::info!(peer = %peer, consumers = consumer_count, "Peer resources released");
}

//! Per-connection WebSocket loop
//!
//! Owns the socket for one peer: reads request frames, answers each with
//! exactly one reply, and interleaves pushes arriving from the hub. The
//! `welcome` event goes out before the first request is read, so the
//! client knows its id from the start. Whatever ends the loop, teardown
//! runs exactly once via `PeerSession::disconnect`.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::media::engine::EngineGate;
use crate::media::types::PeerId;
use crate::protocol::frame::{ReplyFrame, RequestFrame};
use crate::protocol::message::ServerEvent;
use crate::registry::store::SessionRegistry;
use crate::session::handler::PeerSession;
use crate::session::hub::PeerHub;

/// Last-resort reply when serialization itself fails
const INTERNAL_ERROR_REPLY: &str = r#"{"id":0,"error":"internal error"}"#;

fn encode<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Reply serialization failed");
        INTERNAL_ERROR_REPLY.to_string()
    })
}

/// Parse and handle one text frame, producing the reply JSON
async fn dispatch(session: &PeerSession, text: &str) -> String {
    let reply = match serde_json::from_str::<RequestFrame>(text) {
        Ok(frame) => {
            let method = frame.request.method();
            match session.handle(frame.request).await {
                Ok(data) => ReplyFrame::ok(frame.id, data),
                Err(e) => {
                    tracing::warn!(
                        peer = %session.id(),
                        method,
                        request = frame.id,
                        error = %e,
                        "Request failed"
                    );
                    ReplyFrame::err(frame.id, e.to_string())
                }
            }
        }
        Err(e) => {
            // Salvage the correlation id if the envelope at least parsed
            let id = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|value| value.get("id").and_then(serde_json::Value::as_u64))
                .unwrap_or(0);

            tracing::warn!(peer = %session.id(), error = %e, "Malformed request");
            ReplyFrame::err(id, format!("malformed request: {}", e))
        }
    };

    encode(&reply)
}

/// One signaling connection
pub struct Connection<S> {
    peer_id: PeerId,
    peer_addr: SocketAddr,
    ws: WebSocketStream<S>,
    session: PeerSession,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wire up a freshly accepted WebSocket: hub registration and session
    pub async fn new(
        peer_id: PeerId,
        ws: WebSocketStream<S>,
        peer_addr: SocketAddr,
        engine: Arc<EngineGate>,
        registry: Arc<SessionRegistry>,
        hub: Arc<PeerHub>,
    ) -> Self {
        let events = hub.attach(peer_id.clone()).await;
        let session = PeerSession::new(peer_id.clone(), engine, registry, hub);

        Self {
            peer_id,
            peer_addr,
            ws,
            session,
            events,
        }
    }

    /// Drive the connection until the socket closes
    pub async fn run(self) {
        let Connection {
            peer_id,
            peer_addr,
            ws,
            session,
            mut events,
        } = self;

        tracing::debug!(peer = %peer_id, addr = %peer_addr, "Signaling connection open");

        let (mut sink, mut stream) = ws.split();

        let welcome = ServerEvent::Welcome {
            id: peer_id.clone(),
        };
        if sink.send(Message::text(encode(&welcome))).await.is_err() {
            session.disconnect().await;
            return;
        }

        loop {
            tokio::select! {
                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let reply = dispatch(&session, text.as_str()).await;
                            if sink.send(Message::text(reply)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            if sink.send(Message::Pong(payload)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {
                            // Binary and pong frames carry nothing for us
                        }
                        Some(Err(e)) => {
                            tracing::debug!(peer = %peer_id, error = %e, "Socket error");
                            break;
                        }
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            tracing::trace!(peer = %peer_id, event = event.name(), "Pushing event");
                            if sink.send(Message::text(encode(&event))).await.is_err() {
                                break;
                            }
                        }
                        // Hub entry replaced; the connection is done
                        None => break,
                    }
                }
            }
        }

        session.disconnect().await;
        tracing::debug!(peer = %peer_id, addr = %peer_addr, "Signaling connection closed");
    }
}

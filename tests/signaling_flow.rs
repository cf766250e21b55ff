//! End-to-end signaling tests over real WebSocket connections
//!
//! Each test binds a server on an ephemeral port, connects peers with
//! tokio-tungstenite and drives the negotiation protocol exactly as a
//! browser client would.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use sfu_signaling::{EngineGate, LoopbackEngine, ServerConfig, SignalingServer};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server(engine: Arc<EngineGate>) -> (Arc<SignalingServer>, SocketAddr) {
    let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap());
    let server = Arc::new(
        SignalingServer::bind(config, engine)
            .await
            .expect("bind server"),
    );
    let addr = server.local_addr().expect("local addr");

    let runner = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = runner.run().await;
    });

    (server, addr)
}

async fn start_loopback_server() -> (Arc<SignalingServer>, SocketAddr) {
    start_server(Arc::new(EngineGate::ready(Arc::new(LoopbackEngine::new())))).await
}

fn dtls_answer() -> Value {
    json!({
        "role": "client",
        "fingerprints": [{"algorithm": "sha-256", "value": "AA:BB:CC"}]
    })
}

fn video_rtp_parameters() -> Value {
    json!({
        "codecs": [{"mimeType": "video/VP8", "payloadType": 101, "clockRate": 90000}],
        "encodings": [{"ssrc": 1111}]
    })
}

fn audio_rtp_parameters() -> Value {
    json!({
        "codecs": [{"mimeType": "audio/opus", "payloadType": 100, "clockRate": 48000}],
        "encodings": [{"ssrc": 2222}]
    })
}

/// A signaling client: sends correlated requests and stashes server
/// pushes that arrive in between.
struct TestPeer {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    id: String,
    next_request_id: u64,
    pending_events: VecDeque<Value>,
}

impl TestPeer {
    async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = connect_async(format!("ws://{}", addr))
            .await
            .expect("websocket handshake");

        let mut peer = Self {
            ws,
            id: String::new(),
            next_request_id: 0,
            pending_events: VecDeque::new(),
        };

        // The server announces the assigned peer id before anything else.
        let welcome = peer.read_json().await.expect("welcome push");
        assert_eq!(welcome["event"], "welcome");
        peer.id = welcome["data"]["id"]
            .as_str()
            .expect("welcome carries the peer id")
            .to_string();

        peer
    }

    async fn request(&mut self, method: &str, data: Option<Value>) -> Result<Value, String> {
        self.next_request_id += 1;
        let id = self.next_request_id;

        let mut frame = json!({"id": id, "method": method});
        if let Some(data) = data {
            frame["data"] = data;
        }
        self.ws
            .send(Message::text(frame.to_string()))
            .await
            .expect("send request");

        loop {
            let message = self.read_json().await.expect("reply before close");
            if message.get("event").is_some() {
                self.pending_events.push_back(message);
                continue;
            }

            assert_eq!(
                message["id"].as_u64(),
                Some(id),
                "out of order reply: {message}"
            );
            if let Some(error) = message.get("error") {
                return Err(error.as_str().unwrap_or_default().to_string());
            }
            return Ok(message["data"].clone());
        }
    }

    async fn next_event(&mut self) -> Value {
        if let Some(event) = self.pending_events.pop_front() {
            return event;
        }

        let message = self.read_json().await.expect("event before close");
        assert!(
            message.get("event").is_some(),
            "expected a push, got a reply: {message}"
        );
        message
    }

    /// Assert that nothing further arrives within the window.
    async fn expect_quiet(&mut self, window: Duration) {
        assert!(
            self.pending_events.is_empty(),
            "unconsumed events: {:?}",
            self.pending_events
        );
        if let Ok(frame) = timeout(window, self.ws.next()).await {
            panic!("expected no traffic, got {:?}", frame);
        }
    }

    async fn close(mut self) {
        self.ws.close(None).await.ok();
    }

    async fn read_json(&mut self) -> Option<Value> {
        loop {
            let frame = timeout(REPLY_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting on the socket")?;
            match frame.expect("websocket read") {
                Message::Text(text) => {
                    return Some(serde_json::from_str(text.as_str()).expect("valid json frame"));
                }
                Message::Close(_) => return None,
                _ => {}
            }
        }
    }
}

#[tokio::test]
async fn test_two_peer_negotiation_flow() {
    let (_server, addr) = start_loopback_server().await;

    // 1. Peer A connects and sets up its send side
    let mut alice = TestPeer::connect(addr).await;

    let caps = alice
        .request("getRouterRtpCapabilities", None)
        .await
        .expect("router capabilities");
    let codecs: Vec<&str> = caps["codecs"]
        .as_array()
        .expect("codecs array")
        .iter()
        .filter_map(|c| c["mimeType"].as_str())
        .collect();
    assert!(codecs.contains(&"audio/opus"));
    assert!(codecs.contains(&"video/VP8"));

    let transport = alice
        .request("createProducerTransport", None)
        .await
        .expect("producer transport");
    assert!(!transport["id"].as_str().unwrap_or_default().is_empty());
    assert!(!transport["iceCandidates"].as_array().expect("candidates").is_empty());
    assert!(transport["dtlsParameters"]["fingerprints"].is_array());

    let ack = alice
        .request(
            "connectProducerTransport",
            Some(json!({"dtlsParameters": dtls_answer()})),
        )
        .await
        .expect("connect producer transport");
    assert_eq!(ack, json!({}));

    let produced = alice
        .request(
            "produce",
            Some(json!({"kind": "video", "rtpParameters": video_rtp_parameters()})),
        )
        .await
        .expect("produce video");
    let producer_id = produced["id"].as_str().expect("producer id").to_string();
    assert!(!producer_id.is_empty());

    // 2. Peer B joins, discovers A and consumes the video
    let mut bob = TestPeer::connect(addr).await;
    assert_ne!(alice.id, bob.id);

    let current = bob
        .request("getCurrentProducers", Some(json!({"localId": bob.id})))
        .await
        .expect("current producers");
    assert_eq!(current["remoteVideoIds"], json!([alice.id]));
    assert_eq!(current["remoteAudioIds"], json!([]));

    bob.request("createConsumerTransport", None)
        .await
        .expect("consumer transport");
    bob.request(
        "connectConsumerTransport",
        Some(json!({"dtlsParameters": dtls_answer()})),
    )
    .await
    .expect("connect consumer transport");

    let consumer = bob
        .request(
            "consumeAdd",
            Some(json!({
                "rtpCapabilities": caps,
                "remoteId": alice.id,
                "kind": "video"
            })),
        )
        .await
        .expect("consume video");
    assert_eq!(consumer["producerId"], json!(producer_id));
    assert_eq!(consumer["kind"], "video");
    assert_eq!(consumer["paused"], json!(true));
    assert_eq!(consumer["rtpParameters"], video_rtp_parameters());

    let ack = bob
        .request(
            "resumeAdd",
            Some(json!({"remoteId": alice.id, "kind": "video"})),
        )
        .await
        .expect("resume consumer");
    assert_eq!(ack, json!({}));

    // 3. A leaves; B is told exactly once that the producer went away
    let alice_id = alice.id.clone();
    alice.close().await;

    let closed = bob.next_event().await;
    assert_eq!(closed["event"], "producerClosed");
    assert_eq!(closed["data"]["localId"], json!(bob.id));
    assert_eq!(closed["data"]["remoteId"], json!(alice_id));
    assert_eq!(closed["data"]["kind"], "video");

    bob.expect_quiet(Duration::from_millis(300)).await;

    // The consumer is gone server-side as well
    let err = bob
        .request(
            "resumeAdd",
            Some(json!({"remoteId": alice_id, "kind": "video"})),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        format!("consumer not found: {}<-{}/video", bob.id, alice_id)
    );
}

#[tokio::test]
async fn test_new_producer_reaches_connected_peers() {
    let (_server, addr) = start_loopback_server().await;

    let mut alice = TestPeer::connect(addr).await;
    let mut bob = TestPeer::connect(addr).await;

    alice
        .request("createProducerTransport", None)
        .await
        .expect("producer transport");
    alice
        .request(
            "connectProducerTransport",
            Some(json!({"dtlsParameters": dtls_answer()})),
        )
        .await
        .expect("connect producer transport");
    let produced = alice
        .request(
            "produce",
            Some(json!({"kind": "audio", "rtpParameters": audio_rtp_parameters()})),
        )
        .await
        .expect("produce audio");

    let event = bob.next_event().await;
    assert_eq!(event["event"], "newProducer");
    assert_eq!(event["data"]["socketId"], json!(alice.id));
    assert_eq!(event["data"]["producerId"], produced["id"]);
    assert_eq!(event["data"]["kind"], "audio");

    // The producing peer must not hear about its own producer
    alice
        .request("getRouterRtpCapabilities", None)
        .await
        .expect("capabilities");
    assert!(alice.pending_events.is_empty());
}

#[tokio::test]
async fn test_concurrent_transport_creation() {
    let (_server, addr) = start_loopback_server().await;

    let mut alice = TestPeer::connect(addr).await;
    let mut bob = TestPeer::connect(addr).await;

    let (alice_transport, bob_transport) = tokio::join!(
        alice.request("createProducerTransport", None),
        bob.request("createProducerTransport", None)
    );

    let alice_transport = alice_transport.expect("alice transport");
    let bob_transport = bob_transport.expect("bob transport");
    assert_ne!(alice_transport["id"], bob_transport["id"]);
}

#[tokio::test]
async fn test_requests_rejected_until_engine_ready() {
    let (server, addr) = start_server(Arc::new(EngineGate::new())).await;

    // Peers can connect and are welcomed even before the engine exists
    let mut peer = TestPeer::connect(addr).await;
    assert!(!peer.id.is_empty());

    let err = peer
        .request("getRouterRtpCapabilities", None)
        .await
        .unwrap_err();
    assert_eq!(err, "Router not ready");

    let err = peer
        .request("createProducerTransport", None)
        .await
        .unwrap_err();
    assert_eq!(err, "Router not ready");

    // Installing the engine unblocks the same connection
    assert!(server.engine().provide(Arc::new(LoopbackEngine::new())));
    let caps = peer
        .request("getRouterRtpCapabilities", None)
        .await
        .expect("ready after provide");
    assert!(caps["codecs"].is_array());
}

#[tokio::test]
async fn test_consume_unknown_producer_is_an_error() {
    let (_server, addr) = start_loopback_server().await;

    let alice = TestPeer::connect(addr).await;
    let mut bob = TestPeer::connect(addr).await;

    let caps = bob
        .request("getRouterRtpCapabilities", None)
        .await
        .expect("capabilities");
    bob.request("createConsumerTransport", None)
        .await
        .expect("consumer transport");
    bob.request(
        "connectConsumerTransport",
        Some(json!({"dtlsParameters": dtls_answer()})),
    )
    .await
    .expect("connect consumer transport");

    let err = bob
        .request(
            "consumeAdd",
            Some(json!({
                "rtpCapabilities": caps,
                "remoteId": alice.id,
                "kind": "video"
            })),
        )
        .await
        .unwrap_err();
    assert_eq!(err, format!("producer not found: {}/video", alice.id));
}

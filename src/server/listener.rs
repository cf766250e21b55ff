//! Signaling server listener
//!
//! Handles the TCP accept loop, upgrades sockets to WebSocket and spawns
//! connection handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::media::engine::EngineGate;
use crate::media::types::PeerId;
use crate::registry::store::SessionRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::session::hub::PeerHub;

/// WebRTC signaling server
pub struct SignalingServer {
    listener: TcpListener,
    config: ServerConfig,
    engine: Arc<EngineGate>,
    registry: Arc<SessionRegistry>,
    hub: Arc<PeerHub>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SignalingServer {
    /// Bind the listener and assemble the shared session state
    ///
    /// The engine gate may still be empty at this point; requests that
    /// need the engine are rejected until it is provided.
    pub async fn bind(config: ServerConfig, engine: Arc<EngineGate>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Signaling server listening");

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Ok(Self {
            listener,
            config,
            engine,
            registry: Arc::new(SessionRegistry::new()),
            hub: Arc::new(PeerHub::new()),
            connection_semaphore,
        })
    }

    /// Address the server is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get a reference to the session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get a reference to the peer hub
    pub fn hub(&self) -> &Arc<PeerHub> {
        &self.hub
    }

    /// Get a reference to the engine gate
    pub fn engine(&self) -> &Arc<EngineGate> {
        &self.engine
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.accept_loop().await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop() => result,
        }
    }

    async fn accept_loop(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let peer_id = PeerId::generate();
        tracing::debug!(peer = %peer_id, addr = %peer_addr, "New connection");

        let engine = Arc::clone(&self.engine);
        let registry = Arc::clone(&self.registry);
        let hub = Arc::clone(&self.hub);
        let handshake_timeout = self.config.handshake_timeout;

        tokio::spawn(async move {
            // Holds the connection slot until the task finishes
            let _permit = permit;

            let handshake = tokio_tungstenite::accept_async(socket);
            let ws = match tokio::time::timeout(handshake_timeout, handshake).await {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    tracing::debug!(peer = %peer_id, error = %e, "WebSocket handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(peer = %peer_id, "WebSocket handshake timed out");
                    return;
                }
            };

            Connection::new(peer_id, ws, peer_addr, engine, registry, hub)
                .await
                .run()
                .await;
        });
    }
}

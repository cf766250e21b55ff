//! Simple SFU signaling server example backed by the loopback engine
//!
//! Run with: cargo run --example sfu_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example sfu_server                    # binds to 0.0.0.0:3000
//!   cargo run --example sfu_server localhost          # binds to 127.0.0.1:3000
//!   cargo run --example sfu_server 127.0.0.1:3001     # binds to 127.0.0.1:3001
//!   cargo run --example sfu_server 0.0.0.0:8443       # binds to 0.0.0.0:8443
//!
//! ## Talking to the server
//!
//! Any WebSocket client works. With websocat:
//!   websocat ws://localhost:3000
//!
//! The server pushes a welcome event with your peer id, then answers
//! requests, one JSON object per line:
//!   {"id":1,"method":"getRouterRtpCapabilities"}
//!   {"id":2,"method":"createProducerTransport"}
//!
//! ## Features
//!
//! - Loopback media engine: transports and producers are bookkeeping only,
//!   so the full negotiation flow can be exercised without a media stack
//! - newProducer / producerClosed fan-out between connected peers
//! - Connection limit and handshake timeout via ServerConfig

use std::net::SocketAddr;
use std::sync::Arc;

use sfu_signaling::{EngineGate, LoopbackEngine, ServerConfig, SignalingServer};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:3000
/// - "localhost:3001" -> 127.0.0.1:3001
/// - "127.0.0.1" -> 127.0.0.1:3000
/// - "127.0.0.1:3001" -> 127.0.0.1:3001
/// - "0.0.0.0:3000" -> 0.0.0.0:3000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 3000;

    // Replace "localhost" with "127.0.0.1"
    let normalized = arg.replace("localhost", "127.0.0.1");

    // Try parsing as SocketAddr first (includes port)
    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // Try parsing as IP address without port
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: sfu_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:3000)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  sfu_server                     # binds to 0.0.0.0:3000");
    eprintln!("  sfu_server localhost           # binds to 127.0.0.1:3000");
    eprintln!("  sfu_server localhost:3001      # binds to 127.0.0.1:3001");
    eprintln!("  sfu_server 127.0.0.1:3001      # binds to 127.0.0.1:3001");
    eprintln!("  sfu_server 0.0.0.0:8443        # binds to 0.0.0.0:8443");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:3000".parse().unwrap(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sfu_signaling=debug".parse()?)
                .add_directive("sfu_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig {
        bind_addr,
        ..ServerConfig::default()
    };

    println!("Starting SFU signaling server on {}", config.bind_addr);
    println!();
    println!("=== Connect a peer ===");
    println!("websocat: websocat ws://localhost:{}", config.bind_addr.port());
    println!();
    println!("=== Sample requests (one JSON object per line) ===");
    println!("{{\"id\":1,\"method\":\"getRouterRtpCapabilities\"}}");
    println!("{{\"id\":2,\"method\":\"createProducerTransport\"}}");
    println!();

    // The loopback engine fabricates transports and rtp parameters so the
    // signaling flow runs end to end without a media stack behind it.
    let engine = Arc::new(EngineGate::ready(Arc::new(LoopbackEngine::new())));
    let server = SignalingServer::bind(config, engine).await?;

    // Run with Ctrl+C handling
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    Ok(())
}

//! Simple media server example
//!
//! Run with: cargo run --example simple_server [BIND_ADDR] [MEDIA_DIR]
//!
//! Examples:
//!   cargo run --example simple_server                          # 0.0.0.0:8000, ./media
//!   cargo run --example simple_server 127.0.0.1:9000 ./videos  # custom address and directory
//!
//! ## Playing stored media
//!
//!   curl -H "Range: bytes=0-1023" http://localhost:8000/streaming/play/clip.mp4
//!   ffplay http://localhost:8000/streaming/play/clip.mp4
//!
//! ## Relaying a live stream
//!
//! Broadcaster and viewers connect to the same id:
//!   ws://localhost:8000/ws/stream/cam1
//!
//! The broadcaster sends `{"type":"broadcaster_connected"}`, viewers send
//! `{"type":"viewer_connected"}`, and every binary frame is forwarded to the
//! other members.

use std::net::SocketAddr;
use std::time::Duration;

use mediacast::{MediaServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mediacast=debug".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let addr: SocketAddr = match args.next() {
        Some(arg) => arg.parse()?,
        None => "0.0.0.0:8000".parse()?,
    };
    let media_dir = args.next().unwrap_or_else(|| "media".to_string());

    let config = ServerConfig::with_addr(addr).media_dir(&media_dir);
    let server = MediaServer::new(config);

    println!("Serving {} on http://{}", media_dir, addr);
    println!("  GET /streaming/play/{{filename}}");
    println!("  GET /streaming/list");
    println!("  GET /streaming/status");
    println!("  WS  /ws/stream/{{stream_id}}");

    let hub = std::sync::Arc::clone(server.hub());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let stats = hub.stats().await;
            println!(
                "Stats: sessions={} connections={} total={}",
                stats.active_sessions, stats.active_connections, stats.total_connections
            );
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}

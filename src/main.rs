//! mediacast server binary
//!
//! Run with: mediacast [--bind ADDR] [--media-dir DIR]
//!
//! Every flag can also be set from a `MEDIACAST_*` environment variable.
//! Log output is controlled by `RUST_LOG`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mediacast::media::DEFAULT_CHUNK_SIZE;
use mediacast::relay::config::DEFAULT_PEER_QUEUE_CAPACITY;
use mediacast::server::config::DEFAULT_CORS_ORIGIN;
use mediacast::{MediaServer, RelayConfig, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "mediacast", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "MEDIACAST_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Directory media files are served from
    #[arg(long, env = "MEDIACAST_MEDIA_DIR", default_value = "media")]
    media_dir: PathBuf,

    /// Maximum bytes per media body chunk
    #[arg(long, env = "MEDIACAST_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Maximum concurrent relay connections (0 = unlimited)
    #[arg(long, env = "MEDIACAST_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Maximum size of one inbound WebSocket message
    #[arg(long, env = "MEDIACAST_MAX_FRAME_SIZE", default_value_t = 16 * 1024 * 1024)]
    max_frame_size: usize,

    /// Origin allowed to make cross-origin requests (repeatable)
    #[arg(
        long = "cors-origin",
        env = "MEDIACAST_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_CORS_ORIGIN
    )]
    cors_origins: Vec<String>,

    /// Outbound queue capacity per relay connection
    #[arg(long, env = "MEDIACAST_PEER_QUEUE", default_value_t = DEFAULT_PEER_QUEUE_CAPACITY)]
    peer_queue: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mediacast=debug,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = ServerConfig::with_addr(cli.bind)
        .media_dir(cli.media_dir)
        .chunk_size(cli.chunk_size)
        .max_connections(cli.max_connections)
        .max_frame_size(cli.max_frame_size)
        .cors_origins(cli.cors_origins);
    let relay_config = RelayConfig::default().peer_queue_capacity(cli.peer_queue);

    let server = MediaServer::with_relay_config(config, relay_config);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

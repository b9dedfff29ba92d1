//! Media server listener
//!
//! Binds the TCP listener and serves the router until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::media::{FsMediaStore, MediaStore, RangeStreamer};
use crate::relay::{RelayConfig, RelayHub};
use crate::server::config::ServerConfig;
use crate::server::routes::{self, AppState};

/// Media streaming and relay server
pub struct MediaServer {
    config: ServerConfig,
    hub: Arc<RelayHub>,
    streamer: RangeStreamer,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl MediaServer {
    /// Create a new server serving files from `config.media_dir`
    pub fn new(config: ServerConfig) -> Self {
        Self::with_relay_config(config, RelayConfig::default())
    }

    /// Create a new server with custom relay configuration
    pub fn with_relay_config(config: ServerConfig, relay_config: RelayConfig) -> Self {
        let store: Arc<dyn MediaStore> = Arc::new(FsMediaStore::new(config.media_dir.clone()));
        Self::with_store(config, relay_config, store)
    }

    /// Create a new server over any media store
    pub fn with_store(
        config: ServerConfig,
        relay_config: RelayConfig,
        store: Arc<dyn MediaStore>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            streamer: RangeStreamer::with_chunk_size(store, config.chunk_size),
            hub: Arc::new(RelayHub::with_config(relay_config)),
            connection_semaphore,
            config,
        }
    }

    /// Get a reference to the relay hub
    pub fn hub(&self) -> &Arc<RelayHub> {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the router for this server
    pub fn router(&self) -> Router {
        let state = AppState {
            streamer: self.streamer.clone(),
            hub: Arc::clone(&self.hub),
            max_frame_size: self.config.max_frame_size,
            connection_limit: self.connection_semaphore.clone(),
        };
        routes::router(state, &self.config.cors_origins)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;

        tracing::info!(
            addr = %listener.local_addr()?,
            media_dir = %self.config.media_dir.display(),
            "Media server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }
}

//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::media::DEFAULT_CHUNK_SIZE;

/// Smallest chunk size accepted for media bodies
pub const MIN_CHUNK_SIZE: usize = 4 * 1024;

/// Default origin allowed by CORS (the web frontend's dev server)
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Directory media files are served from
    pub media_dir: PathBuf,

    /// Maximum bytes per media body chunk
    pub chunk_size: usize,

    /// Maximum concurrent relay connections (0 = unlimited)
    pub max_connections: usize,

    /// Maximum size of one inbound WebSocket message
    pub max_frame_size: usize,

    /// Origins allowed to make cross-origin requests
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            media_dir: PathBuf::from("media"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_connections: 0, // Unlimited
            max_frame_size: 16 * 1024 * 1024,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the media directory
    pub fn media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = dir.into();
        self
    }

    /// Set the media chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(MIN_CHUNK_SIZE);
        self
    }

    /// Set maximum relay connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set maximum inbound WebSocket message size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Replace the allowed CORS origins
    pub fn cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Check the configuration before serving
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(Error::Config("max_frame_size must be greater than 0".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".into()));
        }
        if self.media_dir.exists() && !self.media_dir.is_dir() {
            return Err(Error::Config(format!(
                "media_dir {} is not a directory",
                self.media_dir.display()
            )));
        }
        Ok(())
    }
}

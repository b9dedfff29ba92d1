//! HTTP server
//!
//! This module provides:
//! - Server configuration
//! - The router and its handlers
//! - The listener that serves the router until shutdown

pub mod config;
pub mod listener;
pub mod routes;

pub use config::ServerConfig;
pub use listener::MediaServer;
pub use routes::{router, AppState, MediaList};

//! Relay connection handling
//!
//! This module provides:
//! - The per-connection state machine
//! - The reader/writer driver that attaches a WebSocket to the relay hub

pub mod connection;
pub mod state;

pub use connection::{next_inbound, write_loop, Inbound, RelayConnection};
pub use state::{ConnectionPhase, ConnectionRole, ConnectionState};

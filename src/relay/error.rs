//! Relay error types
//!
//! None of these ever cross from one connection to another: the hub handles
//! each one where it happens and at most removes the affected peer.

use super::frame::ConnectionId;

/// Error type for relay operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The peer's outbound queue is gone; the connection is closed
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// The peer's outbound queue is full; the frame was not queued
    #[error("outbound queue for connection {0} is full")]
    QueueFull(ConnectionId),

    /// Text frame that is not a control message
    #[error("not a control message: {0}")]
    ProtocolNoise(String),
}

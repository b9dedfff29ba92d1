//! Relay identifiers and outbound frames
//!
//! This module defines the key types for identifying relay sessions and
//! connections, and the frames queued to a connection's writer.

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;

use super::error::RelayError;
use super::message::ServerMessage;

/// Process-unique connection identifier, allocated by the hub
pub type ConnectionId = u64;

/// Key of a relay session (the `{stream_id}` path segment)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new stream id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A frame queued for delivery to one connection
///
/// Cheap to clone: binary payloads are reference-counted `Bytes`, so fanning
/// a frame out to many peers never copies the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Opaque binary payload relayed from another member
    Binary(Bytes),
    /// Server control message, sent as JSON text
    Control(ServerMessage),
}

/// Handle used by the hub to reach one connection's writer
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: ConnectionId,
    tx: mpsc::Sender<OutboundFrame>,
}

impl PeerHandle {
    /// Wrap the sending half of a connection's outbound queue
    pub fn new(id: ConnectionId, tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self { id, tx }
    }

    /// Connection id of this peer
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame without waiting
    ///
    /// Fails with [`RelayError::QueueFull`] when the peer is not keeping up and
    /// [`RelayError::ConnectionClosed`] when its writer has gone away.
    pub fn deliver(&self, frame: OutboundFrame) -> Result<(), RelayError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RelayError::QueueFull(self.id),
            mpsc::error::TrySendError::Closed(_) => RelayError::ConnectionClosed(self.id),
        })
    }
}

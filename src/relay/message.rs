//! JSON control messages exchanged on the relay channel
//!
//! Control messages are text frames carrying a JSON object with a `type`
//! tag. The channel is best-effort: text that does not parse is protocol
//! noise and is dropped by the hub rather than treated as a failure.

use serde::{Deserialize, Serialize};

use super::error::RelayError;
use super::frame::StreamId;

/// Status reported in the connection acknowledgement
pub const STATUS_CONNECTED: &str = "connected";

/// Control message sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The sender wants to be the session's broadcaster
    BroadcasterConnected,
    /// The sender announces itself as a viewer
    ViewerConnected,
    /// Well-formed message with a tag we do not handle
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        serde_json::from_str(text).map_err(|e| RelayError::ProtocolNoise(e.to_string()))
    }
}

/// Control message sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a freshly registered connection
    ConnectionEstablished {
        /// Session the connection joined
        stream_id: String,
        /// Always [`STATUS_CONNECTED`]
        status: String,
    },
    /// Number of other members, sent to a newly registered broadcaster
    ViewerCount {
        /// Members of the session other than the broadcaster
        count: usize,
    },
    /// A viewer announced itself; sent to the broadcaster
    ViewerConnected,
}

impl ServerMessage {
    /// Acknowledgement for a connection that joined `stream_id`
    pub fn established(stream_id: &StreamId) -> Self {
        ServerMessage::ConnectionEstablished {
            stream_id: stream_id.to_string(),
            status: STATUS_CONNECTED.to_string(),
        }
    }
}

//! Statistics for relay connections and sessions

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Per-connection statistics, kept by the connection driver
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Binary frames received from the client
    pub frames_received: u64,
    /// Binary payload bytes received from the client
    pub bytes_received: u64,
    /// Peers the client's frames were queued for, summed over all frames
    pub deliveries: u64,
    /// Control messages that were acted on or ignored
    pub control_messages: u64,
    /// Text frames discarded as noise
    pub discarded_messages: u64,
    /// Connection duration
    pub duration: Duration,
    /// Current bitrate estimate (bits/sec)
    pub bitrate: u64,
}

impl ConnectionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate bitrate from bytes and duration
    pub fn calculate_bitrate(&mut self) {
        self.bitrate = bitrate(self.bytes_received, self.duration);
    }
}

/// Statistics for one relay session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Stream id
    pub stream_id: String,
    /// Connected members, broadcaster included
    pub connections: usize,
    /// Whether a broadcaster is registered
    pub has_broadcaster: bool,
    /// Binary frames relayed
    pub frames_relayed: u64,
    /// Payload bytes handed to peers
    pub bytes_relayed: u64,
    /// Frames skipped for slow peers
    pub dropped_frames: u64,
    /// Time since the session was created
    #[serde(rename = "age_secs", serialize_with = "serialize_secs")]
    pub age: Duration,
    /// Outbound bitrate over the session's lifetime (bits/sec)
    #[serde(rename = "bitrate_bps")]
    pub bitrate: u64,
}

/// Hub-wide statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct HubStats {
    /// Sessions currently alive
    pub active_sessions: usize,
    /// Connections currently registered
    pub active_connections: usize,
    /// Connections registered since startup
    pub total_connections: u64,
    /// Per-session breakdown, sorted by stream id
    pub sessions: Vec<SessionStats>,
}

/// Average bitrate in bits per second, 0 until a full second has passed
pub fn bitrate(bytes: u64, elapsed: Duration) -> u64 {
    match elapsed.as_secs() {
        0 => 0,
        secs => (bytes * 8) / secs,
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

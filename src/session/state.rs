//! Connection state machine
//!
//! Tracks one relay connection from accept to close:
//! `Connecting → Active(role) → Closed`.
//!
//! The role here is the connection's own view. The authoritative broadcaster
//! is whatever the session records, and a later `broadcaster_connected` from
//! another member silently takes the role over.

use std::time::{Duration, Instant};

use crate::relay::{ConnectionId, StreamId};
use crate::stats::ConnectionStats;

/// Role a connection has claimed in its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Plain member; every connection starts here
    Viewer,
    /// Sent `broadcaster_connected`
    Broadcaster,
}

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Upgraded, not yet registered with the hub
    Connecting,
    /// Registered and relaying
    Active(ConnectionRole),
    /// Removed from the hub
    Closed,
}

/// Complete connection state
#[derive(Debug)]
pub struct ConnectionState {
    /// Hub-assigned id, once registered
    pub id: Option<ConnectionId>,

    /// Session the connection belongs to
    pub stream_id: StreamId,

    /// Current phase
    pub phase: ConnectionPhase,

    /// Upgrade time
    pub connected_at: Instant,

    /// Traffic counters
    pub stats: ConnectionStats,
}

impl ConnectionState {
    /// Create state for a connection to `stream_id`
    pub fn new(stream_id: StreamId) -> Self {
        Self {
            id: None,
            stream_id,
            phase: ConnectionPhase::Connecting,
            connected_at: Instant::now(),
            stats: ConnectionStats::new(),
        }
    }

    /// Registered with the hub under `id`
    pub fn activate(&mut self, id: ConnectionId) {
        if self.phase == ConnectionPhase::Connecting {
            self.id = Some(id);
            self.phase = ConnectionPhase::Active(ConnectionRole::Viewer);
        }
    }

    /// Claimed the broadcaster role
    pub fn promote(&mut self) {
        if let ConnectionPhase::Active(_) = self.phase {
            self.phase = ConnectionPhase::Active(ConnectionRole::Broadcaster);
        }
    }

    /// Connection finished; finalizes stats
    pub fn close(&mut self) {
        self.phase = ConnectionPhase::Closed;
        self.stats.duration = self.duration();
        self.stats.calculate_bitrate();
    }

    /// Role while active
    pub fn role(&self) -> Option<ConnectionRole> {
        match self.phase {
            ConnectionPhase::Active(role) => Some(role),
            _ => None,
        }
    }

    /// Time since upgrade
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

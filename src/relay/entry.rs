//! Relay session state
//!
//! This module defines the per-stream state stored in the hub.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::stats::{bitrate, SessionStats};

use super::frame::{ConnectionId, PeerHandle, StreamId};

/// State of one relay session
///
/// Every connection that joined the stream is a member, including the
/// broadcaster. The broadcaster is only a marker on the session.
#[derive(Debug)]
pub struct RelaySession {
    /// Session key
    stream_id: StreamId,

    /// Connected members by id
    members: HashMap<ConnectionId, PeerHandle>,

    /// Current broadcaster, if any member claimed the role
    broadcaster: Option<ConnectionId>,

    /// When the session was created
    created_at: Instant,

    /// Binary frames accepted for relay
    frames_relayed: AtomicU64,

    /// Payload bytes handed to peers (counted once per receiving peer)
    bytes_relayed: AtomicU64,

    /// Frames dropped because a peer's queue was full
    dropped_frames: AtomicU64,
}

impl RelaySession {
    /// Create an empty session
    pub(super) fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            members: HashMap::new(),
            broadcaster: None,
            created_at: Instant::now(),
            frames_relayed: AtomicU64::new(0),
            bytes_relayed: AtomicU64::new(0),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Session key
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Number of connected members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the session has no members left
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` is a member
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    /// Handle for a member
    pub fn peer(&self, id: ConnectionId) -> Option<&PeerHandle> {
        self.members.get(&id)
    }

    /// Current broadcaster
    pub fn broadcaster(&self) -> Option<ConnectionId> {
        self.broadcaster
    }

    /// Number of members other than `id`
    pub fn count_excluding(&self, id: ConnectionId) -> usize {
        self.members.len() - usize::from(self.contains(id))
    }

    /// Handles of every member except `id`
    pub fn peers_except(&self, id: ConnectionId) -> Vec<PeerHandle> {
        self.members
            .values()
            .filter(|peer| peer.id() != id)
            .cloned()
            .collect()
    }

    /// Add a member
    pub(super) fn join(&mut self, peer: PeerHandle) {
        self.members.insert(peer.id(), peer);
    }

    /// Remove a member, clearing the broadcaster if it was them
    ///
    /// Returns whether `id` was a member.
    pub(super) fn leave(&mut self, id: ConnectionId) -> bool {
        if self.broadcaster == Some(id) {
            self.broadcaster = None;
        }
        self.members.remove(&id).is_some()
    }

    /// Make `id` the broadcaster, returning the one it replaces
    pub(super) fn set_broadcaster(&mut self, id: ConnectionId) -> Option<ConnectionId> {
        self.broadcaster.replace(id)
    }

    /// Account for one relayed frame
    pub(super) fn record_relay(&self, payload_len: usize, delivered: usize, dropped: usize) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
        self.bytes_relayed
            .fetch_add((payload_len * delivered) as u64, Ordering::Relaxed);
        self.dropped_frames
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    /// Snapshot of the session's statistics
    pub fn stats(&self) -> SessionStats {
        let age = self.created_at.elapsed();
        let bytes_relayed = self.bytes_relayed.load(Ordering::Relaxed);
        SessionStats {
            stream_id: self.stream_id.to_string(),
            connections: self.members.len(),
            has_broadcaster: self.broadcaster.is_some(),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            bytes_relayed,
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            age,
            bitrate: bitrate(bytes_relayed, age),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn peer(id: ConnectionId) -> PeerHandle {
        let (tx, _rx) = mpsc::channel(1);
        PeerHandle::new(id, tx)
    }

    #[test]
    fn test_membership() {
        let mut session = RelaySession::new(StreamId::from("cam1"));
        session.join(peer(1));
        session.join(peer(2));

        assert_eq!(session.len(), 2);
        assert_eq!(session.count_excluding(1), 1);
        assert_eq!(session.count_excluding(99), 2);

        let others: Vec<_> = session.peers_except(1).iter().map(PeerHandle::id).collect();
        assert_eq!(others, [2]);

        assert!(session.leave(1));
        assert!(!session.leave(1));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_broadcaster_last_writer_wins() {
        let mut session = RelaySession::new(StreamId::from("cam1"));
        session.join(peer(1));
        session.join(peer(2));

        assert_eq!(session.set_broadcaster(1), None);
        assert_eq!(session.set_broadcaster(2), Some(1));
        assert_eq!(session.broadcaster(), Some(2));
    }

    #[test]
    fn test_leave_clears_broadcaster() {
        let mut session = RelaySession::new(StreamId::from("cam1"));
        session.join(peer(1));
        session.join(peer(2));
        session.set_broadcaster(1);

        session.leave(2);
        assert_eq!(session.broadcaster(), Some(1));

        session.leave(1);
        assert_eq!(session.broadcaster(), None);
        assert!(session.is_empty());
    }

    #[test]
    fn test_stats_counters() {
        let mut session = RelaySession::new(StreamId::from("cam1"));
        session.join(peer(1));
        session.set_broadcaster(1);

        session.record_relay(100, 3, 1);
        session.record_relay(50, 2, 0);

        let stats = session.stats();
        assert_eq!(stats.stream_id, "cam1");
        assert_eq!(stats.connections, 1);
        assert!(stats.has_broadcaster);
        assert_eq!(stats.frames_relayed, 2);
        assert_eq!(stats.bytes_relayed, 400);
        assert_eq!(stats.dropped_frames, 1);
    }
}

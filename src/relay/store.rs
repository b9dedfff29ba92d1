//! Relay hub implementation
//!
//! The central hub that owns every relay session and routes frames and
//! control messages between their members.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

use crate::stats::{HubStats, SessionStats};

use super::config::RelayConfig;
use super::entry::RelaySession;
use super::error::RelayError;
use super::frame::{ConnectionId, OutboundFrame, PeerHandle, StreamId};
use super::message::{ClientMessage, ServerMessage};

/// What the hub did with a text frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Not a control message; dropped by policy
    Discarded,
    /// A control message that required no action
    Ignored,
    /// The sender became the session's broadcaster
    BroadcasterRegistered {
        /// Broadcaster it replaced, if any
        previous: Option<ConnectionId>,
        /// Viewer count reported to the sender (0 means nothing was sent)
        viewers: usize,
    },
    /// A viewer announcement was routed to the broadcaster
    ViewerAnnounced {
        /// Broadcaster it was routed to
        broadcaster: ConnectionId,
        /// Whether the broadcaster's queue accepted it
        delivered: bool,
    },
}

/// Result of relaying one binary frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Peers the frame was queued for
    pub delivered: usize,
    /// Peers that were too far behind and skipped the frame
    pub dropped: usize,
    /// Peers found closed and removed from the session
    pub removed: usize,
}

/// Central hub for all relay sessions
///
/// The session map and each session sit behind their own `RwLock`. Locks are
/// always taken map first, then session. Joining and leaving hold the map
/// write lock so that creating and deleting a session can never interleave.
pub struct RelayHub {
    /// Map of stream id to session
    sessions: RwLock<HashMap<StreamId, Arc<RwLock<RelaySession>>>>,

    /// Next connection id to hand out
    next_connection_id: AtomicU64,

    /// Connections registered since startup
    total_connections: AtomicU64,

    /// Configuration
    config: RelayConfig,
}

impl RelayHub {
    /// Create a new hub with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a new hub with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
            total_connections: AtomicU64::new(0),
            config,
        }
    }

    /// Create an outbound queue sized for one connection
    pub fn outbound_channel(&self) -> (mpsc::Sender<OutboundFrame>, mpsc::Receiver<OutboundFrame>) {
        mpsc::channel(self.config.peer_queue_capacity.max(1))
    }

    /// Register a connection into the session for `stream_id`
    ///
    /// The session is created if needed. The connection is acknowledged with
    /// a `connection_established` message before any relayed frame can reach
    /// it.
    pub async fn register(
        &self,
        stream_id: &StreamId,
        tx: mpsc::Sender<OutboundFrame>,
    ) -> ConnectionId {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let peer = PeerHandle::new(id, tx);

        let mut sessions = self.sessions.write().await;
        let session_arc = Arc::clone(sessions.entry(stream_id.clone()).or_insert_with(|| {
            tracing::info!(stream = %stream_id, "Relay session created");
            Arc::new(RwLock::new(RelaySession::new(stream_id.clone())))
        }));
        let mut session = session_arc.write().await;

        if let Err(e) = peer.deliver(OutboundFrame::Control(ServerMessage::established(stream_id))) {
            tracing::debug!(stream = %stream_id, connection_id = id, error = %e, "Acknowledgement not queued");
        }
        session.join(peer);
        self.total_connections.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            stream = %stream_id,
            connection_id = id,
            members = session.len(),
            "Connection registered"
        );

        id
    }

    /// Remove a connection from its session
    ///
    /// Clears the broadcaster if it was this connection and deletes the
    /// session once it is empty. Returns whether the connection was a member.
    pub async fn disconnect(&self, stream_id: &StreamId, id: ConnectionId) -> bool {
        let mut sessions = self.sessions.write().await;

        let Some(session_arc) = sessions.get(stream_id).cloned() else {
            return false;
        };
        let mut session = session_arc.write().await;

        let was_broadcaster = session.broadcaster() == Some(id);
        let removed = session.leave(id);

        if removed {
            tracing::debug!(
                stream = %stream_id,
                connection_id = id,
                was_broadcaster = was_broadcaster,
                members = session.len(),
                "Connection removed"
            );
        }

        if session.is_empty() {
            drop(session);
            sessions.remove(stream_id);
            tracing::info!(stream = %stream_id, "Relay session removed");
        }

        removed
    }

    /// Relay a binary frame from `sender` to every other member
    ///
    /// Peers found closed are removed from the session; the remaining peers
    /// still receive the frame.
    pub async fn relay_frame(
        &self,
        stream_id: &StreamId,
        sender: ConnectionId,
        payload: Bytes,
    ) -> RelayReport {
        let Some(session_arc) = self.session(stream_id).await else {
            return RelayReport::default();
        };

        let peers = {
            let session = session_arc.read().await;
            if !session.contains(sender) {
                return RelayReport::default();
            }
            session.peers_except(sender)
        };

        let mut report = RelayReport::default();
        let mut closed = Vec::new();

        for peer in &peers {
            match peer.deliver(OutboundFrame::Binary(payload.clone())) {
                Ok(()) => report.delivered += 1,
                Err(RelayError::QueueFull(id)) => {
                    report.dropped += 1;
                    tracing::warn!(stream = %stream_id, connection_id = id, "Peer too slow, frame dropped");
                }
                Err(_) => closed.push(peer.id()),
            }
        }

        session_arc
            .read()
            .await
            .record_relay(payload.len(), report.delivered, report.dropped);

        for id in closed {
            tracing::debug!(stream = %stream_id, connection_id = id, "Removing closed peer");
            if self.disconnect(stream_id, id).await {
                report.removed += 1;
            }
        }

        report
    }

    /// Handle a text frame from `sender`
    ///
    /// Text that is not a control message is discarded and logged at debug
    /// level; it never affects the connection.
    pub async fn handle_text(
        &self,
        stream_id: &StreamId,
        sender: ConnectionId,
        text: &str,
    ) -> ControlOutcome {
        match ClientMessage::parse(text) {
            Ok(message) => self.handle_control(stream_id, sender, message).await,
            Err(e) => {
                tracing::debug!(
                    stream = %stream_id,
                    connection_id = sender,
                    error = %e,
                    "Discarding control noise"
                );
                ControlOutcome::Discarded
            }
        }
    }

    /// Handle a parsed control message from `sender`
    pub async fn handle_control(
        &self,
        stream_id: &StreamId,
        sender: ConnectionId,
        message: ClientMessage,
    ) -> ControlOutcome {
        let Some(session_arc) = self.session(stream_id).await else {
            return ControlOutcome::Ignored;
        };

        match message {
            ClientMessage::BroadcasterConnected => {
                let mut session = session_arc.write().await;
                if !session.contains(sender) {
                    return ControlOutcome::Ignored;
                }

                let previous = session.set_broadcaster(sender);
                let viewers = session.count_excluding(sender);

                if let Some(prev) = previous.filter(|&prev| prev != sender) {
                    tracing::info!(
                        stream = %stream_id,
                        previous = prev,
                        connection_id = sender,
                        "Broadcaster replaced"
                    );
                } else {
                    tracing::info!(
                        stream = %stream_id,
                        connection_id = sender,
                        viewers = viewers,
                        "Broadcaster registered"
                    );
                }

                if viewers > 0 {
                    if let Some(peer) = session.peer(sender) {
                        let count = OutboundFrame::Control(ServerMessage::ViewerCount { count: viewers });
                        if let Err(e) = peer.deliver(count) {
                            tracing::debug!(stream = %stream_id, connection_id = sender, error = %e, "Viewer count not sent");
                        }
                    }
                }

                ControlOutcome::BroadcasterRegistered { previous, viewers }
            }
            ClientMessage::ViewerConnected => {
                let session = session_arc.read().await;
                let Some(broadcaster) = session.broadcaster().filter(|&b| b != sender) else {
                    return ControlOutcome::Ignored;
                };

                let delivered = match session.peer(broadcaster) {
                    Some(peer) => match peer.deliver(OutboundFrame::Control(ServerMessage::ViewerConnected)) {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!(
                                stream = %stream_id,
                                broadcaster = broadcaster,
                                error = %e,
                                "Failed to notify broadcaster of viewer"
                            );
                            false
                        }
                    },
                    None => false,
                };

                ControlOutcome::ViewerAnnounced {
                    broadcaster,
                    delivered,
                }
            }
            ClientMessage::Unknown => ControlOutcome::Ignored,
        }
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of members in a session, `None` if the session does not exist
    pub async fn connection_count(&self, stream_id: &StreamId) -> Option<usize> {
        let session_arc = self.session(stream_id).await?;
        let session = session_arc.read().await;
        Some(session.len())
    }

    /// Members of a session other than its broadcaster
    pub async fn viewer_count(&self, stream_id: &StreamId) -> Option<usize> {
        let session_arc = self.session(stream_id).await?;
        let session = session_arc.read().await;
        Some(match session.broadcaster() {
            Some(broadcaster) => session.count_excluding(broadcaster),
            None => session.len(),
        })
    }

    /// Current broadcaster of a session
    pub async fn broadcaster(&self, stream_id: &StreamId) -> Option<ConnectionId> {
        let session_arc = self.session(stream_id).await?;
        let session = session_arc.read().await;
        session.broadcaster()
    }

    /// Statistics for one session
    pub async fn session_stats(&self, stream_id: &StreamId) -> Option<SessionStats> {
        let session_arc = self.session(stream_id).await?;
        let session = session_arc.read().await;
        Some(session.stats())
    }

    /// Statistics for the whole hub, sessions sorted by stream id
    pub async fn stats(&self) -> HubStats {
        let sessions = self.sessions.read().await;

        let mut per_session = Vec::with_capacity(sessions.len());
        for session_arc in sessions.values() {
            per_session.push(session_arc.read().await.stats());
        }
        per_session.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));

        HubStats {
            active_sessions: per_session.len(),
            active_connections: per_session.iter().map(|s| s.connections).sum(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            sessions: per_session,
        }
    }

    async fn session(&self, stream_id: &StreamId) -> Option<Arc<RwLock<RelaySession>>> {
        self.sessions.read().await.get(stream_id).cloned()
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

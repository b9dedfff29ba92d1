//! Per-connection relay driver
//!
//! Each WebSocket gets two tasks: the reader loop in [`RelayConnection::run`],
//! which feeds inbound frames to the hub, and a writer task draining the
//! connection's outbound queue into the socket. A read failure, a close
//! frame, the end of the stream and a failed write all surface as
//! [`Inbound::Closed`] and go through the same cleanup.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::relay::{ControlOutcome, OutboundFrame, RelayHub, StreamId};

use super::state::ConnectionState;

/// What the reader loop got from the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Binary payload to relay
    Frame(Bytes),
    /// Text frame, possibly a control message
    Control(String),
    /// The connection is gone
    Closed,
}

/// Wait for the next relay-relevant frame
///
/// Ping and pong frames are skipped.
pub async fn next_inbound<S>(stream: &mut S) -> Inbound
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Binary(payload))) => return Inbound::Frame(payload),
            Some(Ok(Message::Text(text))) => return Inbound::Control(text.as_str().to_owned()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Inbound::Closed,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "WebSocket read failed");
                return Inbound::Closed;
            }
        }
    }
}

/// Drain `rx` into `sink` until either side goes away
pub async fn write_loop<W>(mut sink: W, mut rx: mpsc::Receiver<OutboundFrame>)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(frame) = rx.recv().await {
        let message = match frame {
            OutboundFrame::Binary(payload) => Message::Binary(payload),
            OutboundFrame::Control(control) => match serde_json::to_string(&control) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode control message");
                    continue;
                }
            },
        };

        if let Err(e) = sink.send(message).await {
            tracing::debug!(error = %e, "WebSocket write failed");
            break;
        }
    }
}

/// One WebSocket attached to a relay session
pub struct RelayConnection {
    hub: Arc<RelayHub>,
    state: ConnectionState,
}

impl RelayConnection {
    /// Prepare a connection to `stream_id`
    pub fn new(hub: Arc<RelayHub>, stream_id: StreamId) -> Self {
        Self {
            hub,
            state: ConnectionState::new(stream_id),
        }
    }

    /// Serve the socket until it closes, then leave the session
    pub async fn run(mut self, socket: WebSocket) {
        let (sink, mut stream) = socket.split();
        let (tx, rx) = self.hub.outbound_channel();
        let mut writer = tokio::spawn(write_loop(sink, rx));

        let stream_id = self.state.stream_id.clone();
        let id = self.hub.register(&stream_id, tx).await;
        self.state.activate(id);

        loop {
            let inbound = tokio::select! {
                inbound = next_inbound(&mut stream) => inbound,
                _ = &mut writer => Inbound::Closed,
            };

            match inbound {
                Inbound::Frame(payload) => {
                    self.state.stats.frames_received += 1;
                    self.state.stats.bytes_received += payload.len() as u64;
                    let report = self.hub.relay_frame(&stream_id, id, payload).await;
                    self.state.stats.deliveries += report.delivered as u64;
                }
                Inbound::Control(text) => {
                    match self.hub.handle_text(&stream_id, id, &text).await {
                        ControlOutcome::Discarded => self.state.stats.discarded_messages += 1,
                        outcome => {
                            self.state.stats.control_messages += 1;
                            if let ControlOutcome::BroadcasterRegistered { .. } = outcome {
                                self.state.promote();
                            }
                        }
                    }
                }
                Inbound::Closed => break,
            }
        }

        let role = self.state.role();
        self.hub.disconnect(&stream_id, id).await;
        writer.abort();
        self.state.close();

        tracing::debug!(
            stream = %stream_id,
            connection_id = id,
            role = ?role,
            frames = self.state.stats.frames_received,
            bytes = self.state.stats.bytes_received,
            bitrate = self.state.stats.bitrate,
            discarded = self.state.stats.discarded_messages,
            "Relay connection closed"
        );
    }
}

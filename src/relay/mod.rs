//! Live relay between a broadcaster and its viewers
//!
//! The hub owns one session per stream id and routes traffic between the
//! connections that joined it. It knows nothing about WebSockets: each
//! connection is represented by the sending half of its outbound queue, and
//! the connection driver in [`crate::session`] pumps that queue to the socket.
//!
//! # Architecture
//!
//! ```text
//!                            Arc<RelayHub>
//!                     ┌─────────────────────────┐
//!                     │ sessions: HashMap<Id,   │
//!                     │   RelaySession {        │
//!                     │     members,            │
//!                     │     broadcaster,        │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [Broadcaster]             [Viewer]                [Viewer]
//!   relay_frame()            outbound rx             outbound rx
//!         │                       │                       │
//!         └──► hub.relay_frame() ─┴──► writer task ──► WebSocket
//! ```
//!
//! # Zero-Copy Fan-out
//!
//! Binary payloads are `bytes::Bytes`, so every peer's queue holds a
//! reference-counted view of the same allocation.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod message;
pub mod store;

pub use config::RelayConfig;
pub use entry::RelaySession;
pub use error::RelayError;
pub use frame::{ConnectionId, OutboundFrame, PeerHandle, StreamId};
pub use message::{ClientMessage, ServerMessage};
pub use store::{ControlOutcome, RelayHub, RelayReport};

//! mediacast: stored media over HTTP byte ranges, plus a live WebSocket relay
//!
//! Two services share one HTTP listener:
//!
//! - [`media::RangeStreamer`] answers `GET /streaming/play/{filename}` with
//!   the whole file or the requested byte range, streamed in bounded chunks.
//! - [`relay::RelayHub`] groups WebSocket connections by stream id and
//!   forwards one broadcaster's binary frames to every viewer in the session.
//!
//! # Example
//!
//! ```no_run
//! use mediacast::{MediaServer, ServerConfig};
//!
//! # async fn run() -> mediacast::Result<()> {
//! let config = ServerConfig::default().media_dir("./media");
//! MediaServer::new(config).run().await
//! # }
//! ```

pub mod error;
pub mod media;
pub mod relay;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use media::{FsMediaStore, RangeStreamer};
pub use relay::{RelayConfig, RelayHub};
pub use server::{MediaServer, ServerConfig};

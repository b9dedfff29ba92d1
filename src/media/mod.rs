//! Stored media delivery
//!
//! This module provides:
//! - Content-type inference from file suffixes
//! - `Range` header parsing and byte-range arithmetic
//! - The storage abstraction and a filesystem backend
//! - Chunked, range-aware response streaming

pub mod mime;
pub mod range;
pub mod store;
pub mod streamer;

pub use mime::content_type_for;
pub use range::{ByteRange, RangeSpec};
pub use store::{FsMediaStore, MediaFile, MediaSource, MediaStore};
pub use streamer::{ChunkStream, MediaResponse, RangeStreamer, DEFAULT_CHUNK_SIZE};

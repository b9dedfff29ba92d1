//! Range-aware media streaming
//!
//! [`RangeStreamer::serve`] resolves a file in the [`MediaStore`], works out
//! which bytes to send, and returns a [`MediaResponse`] whose body is read
//! lazily from the store in chunks of at most `chunk_size` bytes. Nothing
//! beyond one chunk is ever held in memory, and dropping the body (client
//! went away) simply stops the reads.

use std::io::SeekFrom;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;

use crate::error::{Error, Result};

use super::range::{ByteRange, RangeSpec};
use super::store::{MediaFile, MediaSource, MediaStore};

/// Default read chunk size (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Lazily-read body of a media response
pub type ChunkStream = ReaderStream<Take<Box<dyn MediaSource>>>;

/// Serves stored media with byte-range support
#[derive(Clone)]
pub struct RangeStreamer {
    store: Arc<dyn MediaStore>,
    chunk_size: usize,
}

impl RangeStreamer {
    /// Create a streamer over `store` with the default chunk size
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self::with_chunk_size(store, DEFAULT_CHUNK_SIZE)
    }

    /// Create a streamer with a custom chunk size
    pub fn with_chunk_size(store: Arc<dyn MediaStore>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    /// Maximum bytes per body chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Serve `filename`, honoring an optional `Range` header value
    ///
    /// A range header that does not parse is ignored and the full file is
    /// served with 200. A range that parses but lies outside the file fails
    /// with [`Error::RangeNotSatisfiable`].
    pub async fn serve(&self, filename: &str, range_header: Option<&str>) -> Result<MediaResponse> {
        let mut file = self
            .store
            .lookup(filename)
            .await?
            .ok_or_else(|| Error::NotFound(filename.to_string()))?;

        // Lengths come from the open handle, which may differ from the lookup
        let mut source = self.store.open(&file).await?;
        let size = source.seek(SeekFrom::End(0)).await?;
        if size != file.size {
            tracing::debug!(file = %file.name, listed = file.size, actual = size, "File size changed since lookup");
            file.size = size;
        }

        let range = match range_header.map(|h| (h, RangeSpec::parse(h))) {
            Some((_, Some(spec))) => Some(spec.resolve(file.size)?),
            Some((raw, None)) => {
                tracing::debug!(file = %file.name, range = raw, "Unparseable range, serving full file");
                None
            }
            None => None,
        };

        let (offset, length) = match range {
            Some(r) => (r.start, r.len()),
            None => (0, file.size),
        };

        source.seek(SeekFrom::Start(offset)).await?;
        let body = ReaderStream::with_capacity(source.take(length), self.chunk_size);

        tracing::debug!(
            file = %file.name,
            size = file.size,
            offset = offset,
            length = length,
            partial = range.is_some(),
            "Serving media"
        );

        Ok(MediaResponse { file, range, body })
    }
}

/// A resolved media response, ready to be turned into HTTP
pub struct MediaResponse {
    /// The file being served
    pub file: MediaFile,
    /// The byte range being served, `None` for the whole file
    pub range: Option<ByteRange>,
    /// Lazily-read body
    pub body: ChunkStream,
}

impl MediaResponse {
    /// 206 for a ranged response, 200 otherwise
    pub fn status(&self) -> StatusCode {
        if self.range.is_some() {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        }
    }

    /// Number of body bytes
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.file.size, |r| r.len())
    }

    /// `Content-Range` header value for ranged responses
    pub fn content_range(&self) -> Option<String> {
        self.range.map(|r| r.content_range(self.file.size))
    }
}

impl std::fmt::Debug for MediaResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaResponse")
            .field("file", &self.file)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl IntoResponse for MediaResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let content_length = self.content_length();
        let content_range = self.content_range();

        let mut response = Response::new(Body::from_stream(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.file.content_type),
        );
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
        if let Some(value) = content_range.and_then(|v| HeaderValue::from_str(&v).ok()) {
            headers.insert(header::CONTENT_RANGE, value);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    use async_trait::async_trait;
    use futures::StreamExt;
    use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

    use super::*;
    use crate::media::FsMediaStore;

    /// In-memory source that counts the bytes handed out by reads
    struct CountingSource {
        inner: Cursor<Vec<u8>>,
        bytes_read: Arc<AtomicUsize>,
    }

    impl AsyncRead for CountingSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let before = buf.filled().len();
            let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
            if let Poll::Ready(Ok(())) = poll {
                self.bytes_read
                    .fetch_add(buf.filled().len() - before, Ordering::SeqCst);
            }
            poll
        }
    }

    impl AsyncSeek for CountingSource {
        fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> std::io::Result<()> {
            Pin::new(&mut self.inner).start_seek(position)
        }

        fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
            Pin::new(&mut self.inner).poll_complete(cx)
        }
    }

    /// Single-file store whose lookup reports `listed_size`
    struct MemoryStore {
        data: Vec<u8>,
        listed_size: u64,
        bytes_read: Arc<AtomicUsize>,
    }

    impl MemoryStore {
        fn new(data: Vec<u8>, listed_size: u64) -> (Self, Arc<AtomicUsize>) {
            let bytes_read = Arc::new(AtomicUsize::new(0));
            let store = Self {
                data,
                listed_size,
                bytes_read: Arc::clone(&bytes_read),
            };
            (store, bytes_read)
        }
    }

    #[async_trait]
    impl MediaStore for MemoryStore {
        async fn lookup(&self, name: &str) -> Result<Option<MediaFile>> {
            Ok((name == "clip.mp4").then(|| MediaFile::new(name, self.listed_size)))
        }

        async fn open(&self, _file: &MediaFile) -> Result<Box<dyn MediaSource>> {
            Ok(Box::new(CountingSource {
                inner: Cursor::new(self.data.clone()),
                bytes_read: Arc::clone(&self.bytes_read),
            }))
        }

        async fn list(&self) -> Result<Vec<MediaFile>> {
            Ok(vec![MediaFile::new("clip.mp4", self.listed_size)])
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn streamer_with(name: &str, data: &[u8], chunk_size: usize) -> (tempfile::TempDir, RangeStreamer) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), data).unwrap();
        let store: Arc<dyn MediaStore> = Arc::new(FsMediaStore::new(dir.path()));
        (dir, RangeStreamer::with_chunk_size(store, chunk_size))
    }

    async fn collect(mut body: ChunkStream) -> (Vec<u8>, Vec<usize>) {
        let mut data = Vec::new();
        let mut sizes = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.unwrap();
            sizes.push(chunk.len());
            data.extend_from_slice(&chunk);
        }
        (data, sizes)
    }

    #[tokio::test]
    async fn test_full_file_without_range() {
        let data = pattern(5000);
        let (_dir, streamer) = streamer_with("clip.mp4", &data, 1024);

        let response = streamer.serve("clip.mp4", None).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_length(), 5000);
        assert!(response.content_range().is_none());
        let (body, _) = collect(response.body).await;
        assert_eq!(body, data);
    }

    #[tokio::test]
    async fn test_partial_range() {
        let data = pattern(5000);
        let (_dir, streamer) = streamer_with("clip.mp4", &data, 1024);

        let response = streamer
            .serve("clip.mp4", Some("bytes=1000-1999"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.content_length(), 1000);
        assert_eq!(response.content_range().unwrap(), "bytes 1000-1999/5000");
        let (body, _) = collect(response.body).await;
        assert_eq!(body, &data[1000..2000]);
    }

    #[tokio::test]
    async fn test_open_ended_range() {
        let data = pattern(300);
        let (_dir, streamer) = streamer_with("a.mp3", &data, 64);

        let response = streamer.serve("a.mp3", Some("bytes=250-")).await.unwrap();

        assert_eq!(response.content_range().unwrap(), "bytes 250-299/300");
        let (body, _) = collect(response.body).await;
        assert_eq!(body, &data[250..]);
    }

    #[tokio::test]
    async fn test_chunks_are_bounded() {
        let data = pattern(10_000);
        let (_dir, streamer) = streamer_with("big.webm", &data, 1024);

        let response = streamer.serve("big.webm", Some("bytes=100-")).await.unwrap();
        let (body, sizes) = collect(response.body).await;

        assert_eq!(body, &data[100..]);
        assert!(sizes.len() >= 10);
        assert!(sizes.iter().all(|&s| s > 0 && s <= 1024));
    }

    #[tokio::test]
    async fn test_garbage_range_falls_back_to_full_file() {
        let data = pattern(100);
        let (_dir, streamer) = streamer_with("clip.mp4", &data, 1024);

        let response = streamer.serve("clip.mp4", Some("bytes=oops")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_length(), 100);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_dir, streamer) = streamer_with("clip.mp4", b"x", 1024);

        let err = streamer.serve("other.mp4", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(name) if name == "other.mp4"));
    }

    #[tokio::test]
    async fn test_start_past_end_is_unsatisfiable() {
        let (_dir, streamer) = streamer_with("clip.mp4", &pattern(100), 1024);

        let err = streamer.serve("clip.mp4", Some("bytes=100-")).await.unwrap_err();
        assert!(matches!(err, Error::RangeNotSatisfiable { size: 100 }));
    }

    #[tokio::test]
    async fn test_body_is_lazy_and_abandoned_on_drop() {
        const CHUNK: usize = 512;
        let data = pattern(8 * CHUNK);
        let (store, bytes_read) = MemoryStore::new(data.clone(), data.len() as u64);
        let streamer = RangeStreamer::with_chunk_size(Arc::new(store), CHUNK);

        let mut body = streamer.serve("clip.mp4", None).await.unwrap().body;
        assert_eq!(bytes_read.load(Ordering::SeqCst), 0);

        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..], &data[..first.len()]);
        let after_first = bytes_read.load(Ordering::SeqCst);
        assert_eq!(after_first, first.len());
        assert!(after_first <= 2 * CHUNK);

        drop(body);
        tokio::task::yield_now().await;
        assert_eq!(bytes_read.load(Ordering::SeqCst), after_first);
    }

    #[tokio::test]
    async fn test_lengths_follow_opened_source() {
        let data = pattern(4096);
        let (store, _) = MemoryStore::new(data.clone(), 10_000);
        let streamer = RangeStreamer::with_chunk_size(Arc::new(store), 1024);

        let response = streamer.serve("clip.mp4", Some("bytes=0-")).await.unwrap();

        assert_eq!(response.file.size, 4096);
        assert_eq!(response.content_length(), 4096);
        assert_eq!(response.content_range().unwrap(), "bytes 0-4095/4096");
        let (body, _) = collect(response.body).await;
        assert_eq!(body, data);
    }

    #[tokio::test]
    async fn test_into_response_headers() {
        let (_dir, streamer) = streamer_with("clip.mp4", &pattern(50), 1024);

        let response = streamer
            .serve("clip.mp4", Some("bytes=10-19"))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::CONTENT_LENGTH], "10");
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 10-19/50");
    }
}

//! Media storage backends
//!
//! The streamer only needs three things from storage: whether a file exists,
//! how big it is, and a seekable reader over its bytes. [`FsMediaStore`]
//! provides them from a single flat directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncSeek};

use crate::error::Result;

use super::mime::content_type_for;

/// A seekable byte source for a stored file
pub trait MediaSource: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> MediaSource for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

/// Metadata for a stored media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    /// File name as requested by clients
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Content type inferred from the file name
    pub content_type: &'static str,
}

impl MediaFile {
    /// Create media metadata, inferring the content type from `name`
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name);
        Self {
            name,
            size,
            content_type,
        }
    }
}

/// Storage backend consulted by the range streamer
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Look up a file; `Ok(None)` when it does not exist
    async fn lookup(&self, name: &str) -> Result<Option<MediaFile>>;

    /// Open a reader positioned at the start of the file
    async fn open(&self, file: &MediaFile) -> Result<Box<dyn MediaSource>>;

    /// List all stored files, sorted by name
    async fn list(&self) -> Result<Vec<MediaFile>>;
}

/// Media store backed by a flat directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the store serves from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client-supplied name to a path inside the root
    ///
    /// Names that could escape the directory or point at hidden files
    /// resolve to nothing.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let acceptable = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0'])
            && name != "..";

        acceptable.then(|| self.root.join(name))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn lookup(&self, name: &str) -> Result<Option<MediaFile>> {
        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(MediaFile::new(name, meta.len()))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, file: &MediaFile) -> Result<Box<dyn MediaSource>> {
        let path = self
            .resolve(&file.name)
            .ok_or_else(|| crate::error::Error::NotFound(file.name.clone()))?;
        let handle = tokio::fs::File::open(path).await?;
        Ok(Box::new(handle))
    }

    async fn list(&self) -> Result<Vec<MediaFile>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(root = %self.root.display(), "Media directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                files.push(MediaFile::new(name, meta.len()));
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    fn store_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, FsMediaStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, data) in files {
            std::fs::write(dir.path().join(name), data).unwrap();
        }
        let store = FsMediaStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_lookup_existing_file() {
        let (_dir, store) = store_with(&[("clip.mp4", b"0123456789")]);

        let file = store.lookup("clip.mp4").await.unwrap().unwrap();

        assert_eq!(file.size, 10);
        assert_eq!(file.content_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_lookup_missing_file() {
        let (_dir, store) = store_with(&[]);
        assert!(store.lookup("nope.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_rejects_escaping_names() {
        let (dir, store) = store_with(&[(".hidden.mp4", b"x")]);
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert!(store.lookup("../etc/passwd").await.unwrap().is_none());
        assert!(store.lookup("..").await.unwrap().is_none());
        assert!(store.lookup(".hidden.mp4").await.unwrap().is_none());
        assert!(store.lookup("sub").await.unwrap().is_none());
        assert!(store.lookup("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_reads_contents() {
        let (_dir, store) = store_with(&[("a.webm", b"hello")]);
        let file = store.lookup("a.webm").await.unwrap().unwrap();

        let mut reader = store.open(&file).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();

        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn test_list_sorted_regular_files() {
        let (dir, store) = store_with(&[("b.mp4", b"bb"), ("a.mp3", b"a"), (".tmp", b"")]);
        std::fs::create_dir(dir.path().join("folder")).unwrap();

        let files = store.list().await.unwrap();

        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.mp3", "b.mp4"]);
        assert_eq!(files[1].size, 2);
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let store = FsMediaStore::new("/definitely/not/a/real/media/dir");
        assert!(store.list().await.unwrap().is_empty());
    }
}

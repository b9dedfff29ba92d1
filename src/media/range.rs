//! Byte-range request arithmetic
//!
//! A `Range` header goes through two steps:
//!
//! 1. [`RangeSpec::parse`] turns the header text into optional start/end
//!    offsets. Text that does not look like a single `bytes=<start>-<end>`
//!    range yields `None`, and the caller serves the whole file instead.
//! 2. [`RangeSpec::resolve`] applies the defaults and clamping against the
//!    actual file size and produces a [`ByteRange`], or
//!    [`Error::RangeNotSatisfiable`] when nothing of the file is covered.
//!
//! An empty start means offset 0 (not a suffix length), an empty end means
//! the last byte, and an end past the file is clamped to the last byte.

use crate::error::{Error, Result};

/// Inclusive byte range inside a file
///
/// Always satisfies `start <= end < size` for the size it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset
    pub start: u64,
    /// Last byte offset (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range, never zero
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// A parsed but not yet resolved `bytes=<start>-<end>` specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// Requested first byte, if given
    pub start: Option<u64>,
    /// Requested last byte, if given
    pub end: Option<u64>,
}

impl RangeSpec {
    /// Parse a `Range` header value
    ///
    /// Returns `None` for anything other than a single range in byte units.
    pub fn parse(header: &str) -> Option<Self> {
        let (unit, spec) = header.trim().split_once('=')?;
        if !unit.trim().eq_ignore_ascii_case("bytes") {
            return None;
        }

        let spec = spec.trim();
        if spec.contains(',') {
            return None;
        }

        let (start, end) = spec.split_once('-')?;

        Some(Self {
            start: parse_offset(start)?,
            end: parse_offset(end)?,
        })
    }

    /// Resolve against a file of `size` bytes
    pub fn resolve(&self, size: u64) -> Result<ByteRange> {
        if size == 0 {
            return Err(Error::RangeNotSatisfiable { size });
        }

        let last = size - 1;
        let start = self.start.unwrap_or(0);
        let end = self.end.unwrap_or(last).min(last);

        if start > end {
            return Err(Error::RangeNotSatisfiable { size });
        }

        Ok(ByteRange { start, end })
    }
}

/// `Ok(None)` for an empty side, `None` for garbage
fn parse_offset(text: &str) -> Option<Option<u64>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(None);
    }
    text.parse::<u64>().ok().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(start: Option<u64>, end: Option<u64>) -> RangeSpec {
        RangeSpec { start, end }
    }

    #[test]
    fn test_parse_closed_range() {
        assert_eq!(
            RangeSpec::parse("bytes=1000-1999"),
            Some(spec(Some(1000), Some(1999)))
        );
    }

    #[test]
    fn test_parse_open_sides() {
        assert_eq!(RangeSpec::parse("bytes=500-"), Some(spec(Some(500), None)));
        assert_eq!(RangeSpec::parse("bytes=-500"), Some(spec(None, Some(500))));
        assert_eq!(RangeSpec::parse("bytes=-"), Some(spec(None, None)));
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_unit_case() {
        assert_eq!(
            RangeSpec::parse("  Bytes = 1 - 2 "),
            Some(spec(Some(1), Some(2)))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(RangeSpec::parse(""), None);
        assert_eq!(RangeSpec::parse("bytes"), None);
        assert_eq!(RangeSpec::parse("items=0-10"), None);
        assert_eq!(RangeSpec::parse("bytes=abc-10"), None);
        assert_eq!(RangeSpec::parse("bytes=10"), None);
        assert_eq!(RangeSpec::parse("bytes=0-1,5-6"), None);
        assert_eq!(RangeSpec::parse("bytes=-1-2"), None);
    }

    #[test]
    fn test_resolve_closed_range() {
        let range = spec(Some(1000), Some(1999)).resolve(10_000_000).unwrap();

        assert_eq!(range, ByteRange { start: 1000, end: 1999 });
        assert_eq!(range.len(), 1000);
        assert_eq!(range.content_range(10_000_000), "bytes 1000-1999/10000000");
    }

    #[test]
    fn test_resolve_defaults() {
        assert_eq!(
            spec(Some(10), None).resolve(100).unwrap(),
            ByteRange { start: 10, end: 99 }
        );
        assert_eq!(
            spec(None, Some(9)).resolve(100).unwrap(),
            ByteRange { start: 0, end: 9 }
        );
        assert_eq!(
            spec(None, None).resolve(100).unwrap(),
            ByteRange { start: 0, end: 99 }
        );
    }

    #[test]
    fn test_resolve_clamps_end() {
        let range = spec(Some(90), Some(5000)).resolve(100).unwrap();

        assert_eq!(range, ByteRange { start: 90, end: 99 });
        assert_eq!(range.len(), 10);
    }

    #[test]
    fn test_resolve_single_byte() {
        let range = spec(Some(99), Some(99)).resolve(100).unwrap();
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_resolve_unsatisfiable() {
        assert!(matches!(
            spec(Some(100), None).resolve(100),
            Err(Error::RangeNotSatisfiable { size: 100 })
        ));
        assert!(matches!(
            spec(Some(50), Some(10)).resolve(100),
            Err(Error::RangeNotSatisfiable { .. })
        ));
        assert!(matches!(
            spec(None, None).resolve(0),
            Err(Error::RangeNotSatisfiable { size: 0 })
        ));
    }

    #[test]
    fn test_every_subrange_of_small_file() {
        let size = 7;
        for a in 0..size {
            for b in a..size {
                let range = spec(Some(a), Some(b)).resolve(size).unwrap();
                assert_eq!(range.len(), b - a + 1);
                assert_eq!(range.content_range(size), format!("bytes {}-{}/{}", a, b, size));
            }
        }
    }
}

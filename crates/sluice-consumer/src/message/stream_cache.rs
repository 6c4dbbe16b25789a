//! Replayable body cache.

use std::fmt;
use std::io::Cursor;

use bytes::Bytes;

/// An in-memory copy of an object body that can be read any number of times.
///
/// Every call to [`reader`](Self::reader) returns an independent cursor
/// positioned at the start of the body. The cursor implements both
/// [`std::io::Read`] and [`tokio::io::AsyncRead`], so one consumer can drain
/// it and downstream logic can read the same body again without another
/// round-trip to the store.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StreamCache {
    data: Bytes,
}

impl StreamCache {
    /// Caches `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns a fresh reader over the whole body.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// Returns a byte-slice view of the body.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns a cheap clone of the underlying [`Bytes`].
    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for StreamCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCache")
            .field("len", &self.data.len())
            .finish()
    }
}

impl From<Bytes> for StreamCache {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

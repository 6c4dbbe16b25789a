//! Listing entries returned by [`BlobStore::list`](crate::BlobStore::list).

use jiff::Timestamp;
use object_store::ObjectMeta;
use object_store::path::Path;
use serde::{Deserialize, Serialize};

/// Key suffix some tools use to materialise an empty "directory" as an object.
pub const FOLDER_MARKER_SUFFIX: &str = "_$folder$";

/// The kind of entry found while listing a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// A regular object carrying data.
    Blob,
    /// A zero-byte directory marker object.
    Folder,
    /// A common prefix reported by a non-recursive listing.
    RelativePath,
    /// A container entry.
    Container,
}

/// Metadata of a single listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMetadata {
    /// Object key relative to the container.
    pub name: String,
    /// What this entry represents.
    pub kind: StorageKind,
    /// Size in bytes (0 for prefixes).
    pub size: u64,
    /// Last modification time, when the backend reports one.
    pub last_modified: Option<Timestamp>,
}

impl StorageMetadata {
    /// Creates a blob entry with the given name and size.
    pub fn blob(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: StorageKind::Blob,
            size,
            last_modified: None,
        }
    }

    /// Creates an entry of an arbitrary kind.
    pub fn with_kind(name: impl Into<String>, kind: StorageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: 0,
            last_modified: None,
        }
    }

    /// Builds a prefix entry from a non-recursive listing.
    pub(crate) fn relative_path(prefix: &Path) -> Self {
        Self::with_kind(prefix.to_string(), StorageKind::RelativePath)
    }

    /// Returns `true` for data objects with a usable name.
    pub fn is_readable_blob(&self) -> bool {
        self.kind == StorageKind::Blob && !self.name.is_empty()
    }
}

impl From<ObjectMeta> for StorageMetadata {
    fn from(meta: ObjectMeta) -> Self {
        let name = meta.location.to_string();
        let kind = if name.ends_with(FOLDER_MARKER_SUFFIX) {
            StorageKind::Folder
        } else {
            StorageKind::Blob
        };
        let last_modified = Timestamp::new(
            meta.last_modified.timestamp(),
            meta.last_modified.timestamp_subsec_nanos() as i32,
        )
        .ok();

        Self {
            name,
            kind,
            size: meta.size,
            last_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_blob_requires_name_and_kind() {
        assert!(StorageMetadata::blob("a.txt", 1).is_readable_blob());
        assert!(!StorageMetadata::blob("", 1).is_readable_blob());
        assert!(!StorageMetadata::with_kind("dir", StorageKind::RelativePath).is_readable_blob());
        assert!(!StorageMetadata::with_kind("inbox", StorageKind::Container).is_readable_blob());
    }

    #[test]
    fn relative_path_has_no_size() {
        let entry = StorageMetadata::relative_path(&Path::from("orders/2024"));
        assert_eq!(entry.name, "orders/2024");
        assert_eq!(entry.kind, StorageKind::RelativePath);
        assert_eq!(entry.size, 0);
    }
}

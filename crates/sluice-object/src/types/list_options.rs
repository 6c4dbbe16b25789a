//! Options for [`BlobStore::list`](crate::BlobStore::list).

use object_store::path::Path;
use serde::{Deserialize, Serialize};

/// Narrows and bounds a container listing.
///
/// Defaults to a non-recursive, unbounded listing of the container root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Only list entries under this path prefix. Empty means the container root.
    #[serde(default)]
    pub directory: Option<String>,
    /// Upper bound on the number of returned entries.
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Descend into nested prefixes instead of reporting them as entries.
    #[serde(default)]
    pub recursive: bool,
}

impl ListOptions {
    /// Creates options for an unbounded, non-recursive listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the listing to `directory`.
    pub fn in_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Caps the number of returned entries.
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Lists nested objects instead of their common prefixes.
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Returns the listing prefix, ignoring an empty directory.
    pub(crate) fn prefix(&self) -> Option<Path> {
        self.directory
            .as_deref()
            .filter(|dir| !dir.is_empty())
            .map(Path::from)
    }

    /// Returns the effective limit.
    pub(crate) fn limit(&self) -> usize {
        self.max_results.unwrap_or(usize::MAX)
    }
}

//! In-flight unit of work derived from a remote object.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StreamCache;

/// Position of an item within its poll-cycle batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// Zero-based index of the item in the batch.
    pub index: usize,
    /// Number of items in the batch, fixed when draining starts.
    pub size: usize,
}

impl BatchInfo {
    /// Whether this is the last item of its batch.
    pub fn is_last_in_batch(&self) -> bool {
        self.index + 1 == self.size
    }
}

/// One object fetched from a container, ready for downstream processing.
///
/// The source name is fixed at creation and is the key used to delete the
/// object once processing succeeds.
#[derive(Debug, Clone)]
pub struct WorkItem {
    id: Uuid,
    container: String,
    source_name: String,
    body: StreamCache,
    content_type: Option<String>,
    created_at: Timestamp,
    batch: Option<BatchInfo>,
}

impl WorkItem {
    /// Only the builder creates items, so the source name is validated once.
    pub(crate) fn new(
        container: String,
        source_name: String,
        body: StreamCache,
        content_type: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            container,
            source_name,
            body,
            content_type,
            created_at: Timestamp::now(),
            batch: None,
        }
    }

    /// Time-ordered unique id of this item.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Container the item was read from.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Name of the originating object.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Replayable body.
    pub fn body(&self) -> &StreamCache {
        &self.body
    }

    /// MIME content-type reported by the store.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// When the item was built.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Batch position, set once the batch processor picks the item up.
    pub fn batch(&self) -> Option<BatchInfo> {
        self.batch
    }

    /// Convenience for `batch().map(|b| b.is_last_in_batch())`.
    pub fn is_last_in_batch(&self) -> bool {
        self.batch.is_some_and(|b| b.is_last_in_batch())
    }

    pub(crate) fn stamp_batch(&mut self, index: usize, size: usize) {
        self.batch = Some(BatchInfo { index, size });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::new(
            "inbox".into(),
            "a.txt".into(),
            StreamCache::new("a"),
            None,
        )
    }

    #[test]
    fn batch_info_is_unset_at_creation() {
        let item = item();
        assert!(item.batch().is_none());
        assert!(!item.is_last_in_batch());
        assert_eq!(item.source_name(), "a.txt");
        assert_eq!(item.container(), "inbox");
    }

    #[test]
    fn stamping_marks_last_item() {
        let mut item = item();
        item.stamp_batch(1, 3);
        assert_eq!(item.batch(), Some(BatchInfo { index: 1, size: 3 }));
        assert!(!item.is_last_in_batch());

        item.stamp_batch(2, 3);
        assert!(item.is_last_in_batch());
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(item().id(), item().id());
    }
}

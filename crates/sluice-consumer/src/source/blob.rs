//! Blob store backed batch source.

use std::collections::VecDeque;
use std::sync::Arc;

use sluice_object::{BlobStore, ListOptions, ensure_container_exists};

use super::BatchSource;
use crate::TRACING_TARGET_POLL;
use crate::config::ConsumerConfig;
use crate::error::Result;
use crate::message::{WorkItem, WorkItemBuilder};

/// Lists a container, reads each blob into a [`WorkItem`] and deletes the
/// blob once the item is committed.
pub struct BlobStoreSource {
    store: Arc<dyn BlobStore>,
    container: String,
    directory: Option<String>,
    location_id: Option<String>,
    builder: WorkItemBuilder,
}

impl BlobStoreSource {
    /// Creates a source consuming the whole of `container`.
    pub fn new(store: Arc<dyn BlobStore>, container: impl Into<String>) -> Self {
        let container = container.into();
        Self {
            store,
            builder: WorkItemBuilder::new(container.clone()),
            container,
            directory: None,
            location_id: None,
        }
    }

    /// Creates a source from a validated [`ConsumerConfig`].
    pub fn from_config(store: Arc<dyn BlobStore>, config: &ConsumerConfig) -> Self {
        let mut source = Self::new(store, config.container.clone());
        if let Some(directory) = &config.directory {
            source = source.with_directory(directory.clone());
        }
        if let Some(location_id) = &config.location_id {
            source = source.with_location_id(location_id.clone());
        }
        source
    }

    /// Restricts the source to a directory prefix. An empty prefix is ignored.
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        let directory = directory.into();
        self.directory = (!directory.is_empty()).then_some(directory);
        self
    }

    /// Sets the location used when the container is created at startup.
    pub fn with_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    /// Container being consumed.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Directory prefix, if any.
    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    fn list_options(&self, max: usize) -> ListOptions {
        let mut options = ListOptions::new().recursive();
        if let Some(directory) = &self.directory {
            options = options.in_directory(directory.clone());
        }
        if max > 0 {
            options = options.max_results(max);
        }
        options
    }
}

impl std::fmt::Debug for BlobStoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreSource")
            .field("container", &self.container)
            .field("directory", &self.directory)
            .field("location_id", &self.location_id)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl BatchSource for BlobStoreSource {
    async fn start(&self) -> Result<()> {
        ensure_container_exists(
            self.store.as_ref(),
            &self.container,
            self.location_id.as_deref(),
        )
        .await?;
        Ok(())
    }

    async fn fetch(&self, max: usize) -> Result<VecDeque<WorkItem>> {
        let entries = self
            .store
            .list(&self.container, &self.list_options(max))
            .await?;

        let mut queue = VecDeque::with_capacity(entries.len());
        for entry in &entries {
            if !entry.is_readable_blob() {
                tracing::trace!(
                    target: TRACING_TARGET_POLL,
                    name = %entry.name,
                    kind = ?entry.kind,
                    "skipping non-blob entry"
                );
                continue;
            }

            let Some(output) = self.store.read(&self.container, &entry.name).await? else {
                tracing::debug!(
                    target: TRACING_TARGET_POLL,
                    source_name = %entry.name,
                    "object vanished between list and read"
                );
                continue;
            };

            queue.push_back(self.builder.build(entry, output)?);
        }

        Ok(queue)
    }

    async fn commit(&self, item: &WorkItem) -> Result<()> {
        self.store
            .remove(&self.container, item.source_name())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use sluice_object::mock::FaultyStore;
    use sluice_object::{ObjectStoreClient, StorageKind, StorageMetadata};

    use super::*;
    use crate::error::ConsumerError;

    async fn seeded(keys: &[&str]) -> ObjectStoreClient {
        let client = ObjectStoreClient::memory();
        client.create_container("inbox", None).await.unwrap();
        for key in keys {
            client
                .put("inbox", key, Bytes::from(key.to_string()), None)
                .await
                .unwrap();
        }
        client
    }

    fn names(queue: &VecDeque<WorkItem>) -> Vec<&str> {
        queue.iter().map(WorkItem::source_name).collect()
    }

    #[tokio::test]
    async fn fetches_in_listing_order_without_deleting() {
        let client = seeded(&["a", "b", "c"]).await;
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");

        let queue = source.fetch(10).await.unwrap();
        assert_eq!(names(&queue), ["a", "b", "c"]);
        assert_eq!(queue[1].body().as_bytes(), b"b");
        assert!(client.read("inbox", "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn bounds_and_zero_means_unbounded() {
        let client = seeded(&["a", "b", "c"]).await;
        let source = BlobStoreSource::new(Arc::new(client), "inbox");

        assert_eq!(source.fetch(2).await.unwrap().len(), 2);
        assert_eq!(source.fetch(0).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn restricts_to_directory() {
        let client = seeded(&["orders/1", "orders/2", "other/3"]).await;
        let source = BlobStoreSource::new(Arc::new(client), "inbox").with_directory("orders");

        let queue = source.fetch(10).await.unwrap();
        assert_eq!(names(&queue), ["orders/1", "orders/2"]);
    }

    #[tokio::test]
    async fn skips_folders_and_unnamed_entries() {
        let store = FaultyStore::new(seeded(&["a"]).await);
        store.inject_entry(StorageMetadata::with_kind("dir", StorageKind::Folder));
        store.inject_entry(StorageMetadata::blob("", 0));
        let source = BlobStoreSource::new(Arc::new(store), "inbox");

        let queue = source.fetch(10).await.unwrap();
        assert_eq!(names(&queue), ["a"]);
    }

    #[tokio::test]
    async fn skips_objects_deleted_after_listing() {
        let store = FaultyStore::new(seeded(&["a"]).await);
        store.inject_entry(StorageMetadata::blob("gone", 4));
        let source = BlobStoreSource::new(Arc::new(store), "inbox");

        let queue = source.fetch(10).await.unwrap();
        assert_eq!(names(&queue), ["a"]);
    }

    #[tokio::test]
    async fn read_failure_fails_the_whole_fetch() {
        let store = FaultyStore::new(seeded(&["a", "b"]).await);
        store.fail_read("b");
        let source = BlobStoreSource::new(Arc::new(store), "inbox");

        let err = source.fetch(10).await.unwrap_err();
        assert!(matches!(err, ConsumerError::Store(_)));
    }

    #[tokio::test]
    async fn commit_removes_the_source_object() {
        let client = seeded(&["a"]).await;
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");

        let queue = source.fetch(10).await.unwrap();
        source.commit(&queue[0]).await.unwrap();
        assert!(client.read("inbox", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_creates_missing_container() {
        let client = ObjectStoreClient::memory();
        let source = BlobStoreSource::from_config(
            Arc::new(client.clone()),
            &ConsumerConfig::new("fresh").with_location_id("local"),
        );

        source.start().await.unwrap();
        assert!(client.container_exists("fresh").await.unwrap());
    }
}

//! Container-scoped object-store client backed by [`object_store::ObjectStore`].
//!
//! [`ObjectStoreClient`] is a thin, cloneable handle that opens one store per
//! container through a [`Provider`] and caches it for later calls. Every
//! public method is instrumented with [`tracing`] for observability.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path;
use object_store::{Attribute, ObjectMeta, ObjectStore, PutMode, PutOptions, PutPayload};
use tokio::sync::RwLock;

use crate::TRACING_TARGET;
use crate::providers::{MemoryProvider, Provider};
use crate::types::{Error, ListOptions, StorageMetadata};

mod get_output;
mod put_output;

pub use get_output::GetOutput;
pub use put_output::PutOutput;

type StoreCache = HashMap<String, Arc<dyn ObjectStore>>;

/// Cloneable handle to the containers of one [`Provider`].
///
/// All methods accept human-readable string keys and convert them to
/// [`object_store::path::Path`] internally.
#[derive(Clone)]
pub struct ObjectStoreClient {
    provider: Arc<dyn Provider>,
    stores: Arc<RwLock<StoreCache>>,
}

impl ObjectStoreClient {
    /// Wrap a concrete [`Provider`].
    pub fn new(provider: impl Provider) -> Self {
        Self::from_provider(Arc::new(provider))
    }

    /// Wrap a shared [`Provider`].
    pub fn from_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            stores: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a client over fresh in-memory containers.
    pub fn memory() -> Self {
        Self::new(MemoryProvider::new())
    }

    /// Returns the identifier of the underlying provider.
    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    /// Returns the cached store for `container`, opening it on first use.
    async fn store(&self, container: &str) -> Result<Arc<dyn ObjectStore>, Error> {
        if let Some(store) = self.stores.read().await.get(container) {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write().await;
        if let Some(store) = stores.get(container) {
            return Ok(store.clone());
        }

        let store = self.provider.open(container).await?;
        tracing::debug!(
            target: TRACING_TARGET,
            provider = self.provider.id(),
            container,
            "opened container store"
        );
        stores.insert(container.to_owned(), store.clone());
        Ok(store)
    }

    /// Check whether `container` exists.
    #[tracing::instrument(name = "object.container_exists", skip(self))]
    pub async fn container_exists(&self, container: &str) -> Result<bool, Error> {
        self.provider.container_exists(container).await
    }

    /// Create `container`, optionally in the backend location `location_id`.
    #[tracing::instrument(name = "object.create_container", skip(self))]
    pub async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error> {
        self.provider.create_container(container, location_id).await
    }

    /// List entries of `container` according to `options`.
    ///
    /// Recursive listings report every object under the prefix; objects whose
    /// key ends with the folder-marker suffix are reported as folders.
    /// Non-recursive listings report nested prefixes as relative paths followed
    /// by the objects directly under the prefix. At most
    /// [`max_results`](ListOptions::max_results) entries are returned.
    #[tracing::instrument(
        name = "object.list",
        skip(self, options),
        fields(directory = ?options.directory, recursive = options.recursive, count)
    )]
    pub async fn list(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<StorageMetadata>, Error> {
        let store = self.store(container).await?;
        let prefix = options.prefix();
        let limit = options.limit();

        let entries: Vec<StorageMetadata> = if options.recursive {
            store
                .list(prefix.as_ref())
                .take(limit)
                .map_ok(StorageMetadata::from)
                .try_collect()
                .await?
        } else {
            let result = store.list_with_delimiter(prefix.as_ref()).await?;
            result
                .common_prefixes
                .iter()
                .map(StorageMetadata::relative_path)
                .chain(result.objects.into_iter().map(StorageMetadata::from))
                .take(limit)
                .collect()
        };

        tracing::Span::current().record("count", entries.len() as u64);
        Ok(entries)
    }

    /// Retrieve the raw bytes, content-type, and metadata stored at `key`.
    #[tracing::instrument(name = "object.get", skip(self))]
    pub async fn get(&self, container: &str, key: &str) -> Result<GetOutput, Error> {
        let store = self.store(container).await?;
        fetch(store.as_ref(), key).await
    }

    /// Like [`get`](Self::get), but reports a missing object as `None`.
    ///
    /// A missing container is still an error.
    #[tracing::instrument(name = "object.read", skip(self))]
    pub async fn read(&self, container: &str, key: &str) -> Result<Option<GetOutput>, Error> {
        let store = self.store(container).await?;
        match fetch(store.as_ref(), key).await {
            Ok(output) => Ok(Some(output)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Upload `data` to `key`, optionally setting the content-type.
    #[tracing::instrument(name = "object.put", skip(self, data), fields(size = data.len()))]
    pub async fn put(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutOutput, Error> {
        let store = self.store(container).await?;
        let mut opts = PutOptions {
            mode: PutMode::Overwrite,
            ..Default::default()
        };
        if let Some(ct) = content_type {
            opts.attributes
                .insert(Attribute::ContentType, ct.to_string().into());
        }

        let result = store
            .put_opts(&Path::from(key), PutPayload::from(data), opts)
            .await?;
        Ok(result.into())
    }

    /// Get object metadata without downloading the body.
    #[tracing::instrument(name = "object.head", skip(self))]
    pub async fn head(&self, container: &str, key: &str) -> Result<ObjectMeta, Error> {
        let store = self.store(container).await?;
        Ok(store.head(&Path::from(key)).await?)
    }

    /// Delete the object at `key`.
    #[tracing::instrument(name = "object.delete", skip(self))]
    pub async fn delete(&self, container: &str, key: &str) -> Result<(), Error> {
        let store = self.store(container).await?;
        Ok(store.delete(&Path::from(key)).await?)
    }
}

impl fmt::Debug for ObjectStoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreClient")
            .field("provider", &self.provider.id())
            .finish_non_exhaustive()
    }
}

/// Fetch an object and its content-type from an opened store.
async fn fetch(store: &dyn ObjectStore, key: &str) -> Result<GetOutput, Error> {
    let result = store.get(&Path::from(key)).await?;
    let meta = result.meta.clone();
    let content_type = result
        .attributes
        .get(&Attribute::ContentType)
        .map(|v| v.to_string());
    let data = result.bytes().await?;

    Ok(GetOutput {
        data,
        content_type,
        meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LocalProvider;
    use crate::types::{FOLDER_MARKER_SUFFIX, StorageKind};

    async fn test_client() -> ObjectStoreClient {
        let client = ObjectStoreClient::memory();
        client.create_container("inbox", None).await.unwrap();
        client
    }

    async fn seed(client: &ObjectStoreClient, keys: &[&str]) {
        for key in keys {
            client
                .put("inbox", key, Bytes::from(key.to_string()), None)
                .await
                .unwrap();
        }
    }

    fn names(entries: &[StorageMetadata]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn put_and_get() {
        let client = test_client().await;
        let data = Bytes::from("hello world");
        client
            .put("inbox", "test.txt", data.clone(), Some("text/plain"))
            .await
            .unwrap();

        let result = client.get("inbox", "test.txt").await.unwrap();
        assert_eq!(result.data, data);
        assert_eq!(result.content_type.as_deref(), Some("text/plain"));
        assert_eq!(result.meta.size, 11);
    }

    #[tokio::test]
    async fn missing_container_is_not_found() {
        let client = ObjectStoreClient::memory();
        let err = client
            .list("nowhere", &ListOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = client.read("nowhere", "a.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn read_missing_object_is_none() {
        let client = test_client().await;
        assert!(client.read("inbox", "missing").await.unwrap().is_none());

        let err = client.get("inbox", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn head_and_delete() {
        let client = test_client().await;
        seed(&client, &["del.bin"]).await;

        let meta = client.head("inbox", "del.bin").await.unwrap();
        assert_eq!(meta.location, Path::from("del.bin"));

        client.delete("inbox", "del.bin").await.unwrap();
        assert!(client.read("inbox", "del.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recursive_list_is_bounded_and_ordered() {
        let client = test_client().await;
        seed(&client, &["c.txt", "a.txt", "b.txt", "nested/d.txt"]).await;

        let all = client
            .list("inbox", &ListOptions::new().recursive())
            .await
            .unwrap();
        assert_eq!(names(&all), ["a.txt", "b.txt", "c.txt", "nested/d.txt"]);
        assert!(all.iter().all(|e| e.kind == StorageKind::Blob));

        let bounded = client
            .list("inbox", &ListOptions::new().max_results(2).recursive())
            .await
            .unwrap();
        assert_eq!(names(&bounded), ["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn list_in_directory() {
        let client = test_client().await;
        seed(&client, &["orders/1.json", "orders/2.json", "other/3.json"]).await;

        let entries = client
            .list("inbox", &ListOptions::new().in_directory("orders").recursive())
            .await
            .unwrap();
        assert_eq!(names(&entries), ["orders/1.json", "orders/2.json"]);
    }

    #[tokio::test]
    async fn non_recursive_reports_prefixes() {
        let client = test_client().await;
        seed(&client, &["top.txt", "orders/1.json", "orders/deep/2.json"]).await;

        let entries = client.list("inbox", &ListOptions::new()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "orders");
        assert_eq!(entries[0].kind, StorageKind::RelativePath);
        assert_eq!(entries[1].name, "top.txt");
        assert_eq!(entries[1].kind, StorageKind::Blob);
    }

    #[tokio::test]
    async fn folder_markers_are_reported() {
        let client = test_client().await;
        let marker = format!("orders{FOLDER_MARKER_SUFFIX}");
        seed(&client, &[marker.as_str(), "orders/1.json"]).await;

        let entries = client
            .list("inbox", &ListOptions::new().recursive())
            .await
            .unwrap();
        let folder = entries.iter().find(|e| e.name == marker).unwrap();
        assert_eq!(folder.kind, StorageKind::Folder);
    }

    #[tokio::test]
    async fn local_provider_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let client = ObjectStoreClient::new(LocalProvider::new(root.path()));
        assert!(!client.container_exists("inbox").await.unwrap());

        client.create_container("inbox", None).await.unwrap();
        client
            .put("inbox", "orders/1.json", Bytes::from("{}"), None)
            .await
            .unwrap();
        assert!(root.path().join("inbox/orders/1.json").is_file());

        let entries = client
            .list("inbox", &ListOptions::new().recursive())
            .await
            .unwrap();
        assert_eq!(names(&entries), ["orders/1.json"]);
    }
}

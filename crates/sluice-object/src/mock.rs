//! Fault-injecting [`BlobStore`] wrapper for tests.
//!
//! Only available with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! sluice-object = { version = "...", features = ["test-utils"] }
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::client::{GetOutput, ObjectStoreClient};
use crate::store::BlobStore;
use crate::types::{Error, ListOptions, StorageMetadata};

/// Wraps a [`BlobStore`] and fails selected operations on demand.
///
/// Also records every successful removal so tests can assert on delete
/// order, and can prepend synthetic entries (folders, empty names) to
/// listings.
#[derive(Debug)]
pub struct FaultyStore<S = ObjectStoreClient> {
    inner: S,
    fail_list: AtomicBool,
    fail_read: Mutex<HashSet<String>>,
    fail_remove: Mutex<HashSet<String>>,
    extra_entries: Mutex<Vec<StorageMetadata>>,
    removed: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: BlobStore> FaultyStore<S> {
    /// Wraps `inner` with no faults configured.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_list: AtomicBool::new(false),
            fail_read: Mutex::default(),
            fail_remove: Mutex::default(),
            extra_entries: Mutex::default(),
            removed: Mutex::default(),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Makes every subsequent listing fail (or succeed again).
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Makes reads of `name` fail.
    pub fn fail_read(&self, name: impl Into<String>) {
        lock(&self.fail_read).insert(name.into());
    }

    /// Makes removals of `name` fail.
    pub fn fail_remove(&self, name: impl Into<String>) {
        lock(&self.fail_remove).insert(name.into());
    }

    /// Prepends `entry` to every listing.
    pub fn inject_entry(&self, entry: StorageMetadata) {
        lock(&self.extra_entries).push(entry);
    }

    /// Names removed so far, in removal order.
    pub fn removed(&self) -> Vec<String> {
        lock(&self.removed).clone()
    }
}

#[async_trait::async_trait]
impl<S: BlobStore> BlobStore for FaultyStore<S> {
    async fn list(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<StorageMetadata>, Error> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::runtime("injected list failure", "mock", true));
        }

        let listed = self.inner.list(container, options).await?;
        let mut entries = lock(&self.extra_entries).clone();
        entries.extend(listed);
        Ok(entries)
    }

    async fn read(&self, container: &str, name: &str) -> Result<Option<GetOutput>, Error> {
        if lock(&self.fail_read).contains(name) {
            return Err(Error::runtime(
                format!("injected read failure for '{name}'"),
                "mock",
                true,
            ));
        }
        self.inner.read(container, name).await
    }

    async fn remove(&self, container: &str, name: &str) -> Result<(), Error> {
        if lock(&self.fail_remove).contains(name) {
            return Err(Error::runtime(
                format!("injected remove failure for '{name}'"),
                "mock",
                true,
            ));
        }
        self.inner.remove(container, name).await?;
        lock(&self.removed).push(name.to_owned());
        Ok(())
    }

    async fn container_exists(&self, container: &str) -> Result<bool, Error> {
        self.inner.container_exists(container).await
    }

    async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error> {
        self.inner.create_container(container, location_id).await
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::types::StorageKind;

    #[tokio::test]
    async fn injects_faults_and_records_removals() {
        let client = ObjectStoreClient::memory();
        client.create_container("inbox", None).await.unwrap();
        for key in ["a", "b"] {
            client
                .put("inbox", key, Bytes::from(key), None)
                .await
                .unwrap();
        }

        let store = FaultyStore::new(client);
        store.inject_entry(StorageMetadata::with_kind("dir", StorageKind::Folder));
        let entries = store
            .list("inbox", &ListOptions::new().recursive())
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, StorageKind::Folder);

        store.fail_remove("b");
        store.remove("inbox", "a").await.unwrap();
        assert!(store.remove("inbox", "b").await.is_err());
        assert_eq!(store.removed(), ["a"]);

        store.fail_read("a");
        assert!(store.read("inbox", "a").await.is_err());

        store.fail_list(true);
        assert!(store.list("inbox", &ListOptions::new()).await.is_err());
    }
}

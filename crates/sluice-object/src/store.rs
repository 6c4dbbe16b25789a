//! Capability interface consumed by the poller.

use std::sync::Arc;

use crate::TRACING_TARGET;
use crate::client::{GetOutput, ObjectStoreClient};
use crate::types::{Error, ListOptions, StorageMetadata};

/// The blob store operations a polling consumer relies on.
///
/// Every operation is scoped to a named container. Implemented by
/// [`ObjectStoreClient`]; tests wrap it to inject failures.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// List entries of `container`.
    async fn list(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<StorageMetadata>, Error>;

    /// Read an object, returning `None` when it no longer exists.
    async fn read(&self, container: &str, name: &str) -> Result<Option<GetOutput>, Error>;

    /// Remove an object.
    async fn remove(&self, container: &str, name: &str) -> Result<(), Error>;

    /// Check whether `container` exists.
    async fn container_exists(&self, container: &str) -> Result<bool, Error>;

    /// Create `container`, optionally in the backend location `location_id`.
    async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error>;
}

#[async_trait::async_trait]
impl BlobStore for ObjectStoreClient {
    async fn list(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<StorageMetadata>, Error> {
        ObjectStoreClient::list(self, container, options).await
    }

    async fn read(&self, container: &str, name: &str) -> Result<Option<GetOutput>, Error> {
        ObjectStoreClient::read(self, container, name).await
    }

    async fn remove(&self, container: &str, name: &str) -> Result<(), Error> {
        self.delete(container, name).await
    }

    async fn container_exists(&self, container: &str) -> Result<bool, Error> {
        ObjectStoreClient::container_exists(self, container).await
    }

    async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error> {
        ObjectStoreClient::create_container(self, container, location_id).await
    }
}

#[async_trait::async_trait]
impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    async fn list(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<StorageMetadata>, Error> {
        (**self).list(container, options).await
    }

    async fn read(&self, container: &str, name: &str) -> Result<Option<GetOutput>, Error> {
        (**self).read(container, name).await
    }

    async fn remove(&self, container: &str, name: &str) -> Result<(), Error> {
        (**self).remove(container, name).await
    }

    async fn container_exists(&self, container: &str) -> Result<bool, Error> {
        (**self).container_exists(container).await
    }

    async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error> {
        (**self).create_container(container, location_id).await
    }
}

/// Creates `container` in `location_id` unless it already exists.
pub async fn ensure_container_exists(
    store: &dyn BlobStore,
    container: &str,
    location_id: Option<&str>,
) -> Result<(), Error> {
    if store.container_exists(container).await? {
        tracing::trace!(target: TRACING_TARGET, container, "container exists");
        return Ok(());
    }

    tracing::info!(
        target: TRACING_TARGET,
        container,
        location_id,
        "creating missing container"
    );
    store.create_container(container, location_id).await
}

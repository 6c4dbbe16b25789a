//! Provider trait for opening container-scoped object stores.

use std::sync::Arc;

use object_store::ObjectStore;
use object_store::path::Path;

use crate::types::Error;

/// Key probed to check whether a container is reachable.
const PROBE_KEY: &str = "_sluice_probe";

/// Factory for the [`ObjectStore`] backing each container.
///
/// A container is the top-level namespace of a backend: an S3 or GCS bucket,
/// an Azure Blob container, a directory under a local root, or an in-memory
/// store.
#[async_trait::async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Unique identifier (e.g. `"s3"`, `"memory"`), used as an error label.
    fn id(&self) -> &'static str;

    /// Opens the store backing `container`.
    async fn open(&self, container: &str) -> Result<Arc<dyn ObjectStore>, Error>;

    /// Checks whether `container` exists.
    ///
    /// The default implementation issues a HEAD for a probe key; a not-found
    /// response means the container itself is reachable.
    async fn container_exists(&self, container: &str) -> Result<bool, Error> {
        let store = self.open(container).await?;
        probe(store.as_ref()).await
    }

    /// Creates `container`, optionally in the backend location `location_id`.
    ///
    /// Remote buckets are provisioned out of band, so the default
    /// implementation reports the operation as unsupported.
    async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error> {
        let _ = location_id;
        Err(Error::unsupported(
            format!("create container '{container}'"),
            self.id(),
        ))
    }
}

/// Issues a HEAD for the probe key, treating not-found as reachable.
async fn probe(store: &dyn ObjectStore) -> Result<bool, Error> {
    match store.head(&Path::from(PROBE_KEY)).await {
        Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(true),
        Err(e) => Err(e.into()),
    }
}

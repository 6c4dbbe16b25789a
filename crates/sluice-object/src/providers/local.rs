//! Local filesystem provider using [`object_store::local::LocalFileSystem`].

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::TRACING_TARGET;
use crate::types::Error;

/// Typed configuration for the local filesystem provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LocalCredentials {
    /// Directory holding one sub-directory per container.
    pub root: PathBuf,
}

/// Maps each container to a directory under a root path.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    /// Creates a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a provider from typed configuration.
    pub fn from_credentials(creds: &LocalCredentials) -> Self {
        Self::new(creds.root.clone())
    }

    /// Returns the root directory.
    pub fn root(&self) -> &FsPath {
        &self.root
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }
}

#[async_trait::async_trait]
impl Provider for LocalProvider {
    fn id(&self) -> &'static str {
        "local"
    }

    async fn open(&self, container: &str) -> Result<Arc<dyn ObjectStore>, Error> {
        let dir = self.container_dir(container);
        if !self.container_exists(container).await? {
            return Err(Error::not_found(
                format!("container '{}'", dir.display()),
                self.id(),
            ));
        }

        let store = LocalFileSystem::new_with_prefix(&dir)
            .map_err(|e| Error::connection(e.to_string(), self.id(), false).with_source(e))?;
        Ok(Arc::new(store))
    }

    async fn container_exists(&self, container: &str) -> Result<bool, Error> {
        match tokio::fs::metadata(self.container_dir(container)).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::runtime(e.to_string(), self.id(), true).with_source(e)),
        }
    }

    async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error> {
        let dir = self.container_dir(container);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::runtime(e.to_string(), self.id(), false).with_source(e))?;

        tracing::debug!(
            target: TRACING_TARGET,
            container,
            location_id,
            path = %dir.display(),
            "created local container directory"
        );
        Ok(())
    }
}

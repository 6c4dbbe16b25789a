//! In-memory provider using [`object_store::memory::InMemory`].

use std::collections::HashMap;
use std::sync::Arc;

use object_store::ObjectStore;
use object_store::memory::InMemory;
use tokio::sync::RwLock;

use super::Provider;
use crate::TRACING_TARGET;
use crate::types::Error;

/// Keeps one [`InMemory`] store per container.
///
/// Containers only exist once created with
/// [`create_container`](Provider::create_container).
#[derive(Debug, Default)]
pub struct MemoryProvider {
    containers: RwLock<HashMap<String, Arc<InMemory>>>,
}

impl MemoryProvider {
    /// Creates a provider with no containers.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Provider for MemoryProvider {
    fn id(&self) -> &'static str {
        "memory"
    }

    async fn open(&self, container: &str) -> Result<Arc<dyn ObjectStore>, Error> {
        let containers = self.containers.read().await;
        match containers.get(container) {
            Some(store) => Ok(store.clone() as Arc<dyn ObjectStore>),
            None => Err(Error::not_found(
                format!("container '{container}'"),
                self.id(),
            )),
        }
    }

    async fn container_exists(&self, container: &str) -> Result<bool, Error> {
        Ok(self.containers.read().await.contains_key(container))
    }

    async fn create_container(
        &self,
        container: &str,
        location_id: Option<&str>,
    ) -> Result<(), Error> {
        let mut containers = self.containers.write().await;
        containers
            .entry(container.to_owned())
            .or_insert_with(|| Arc::new(InMemory::new()));

        tracing::debug!(
            target: TRACING_TARGET,
            container,
            location_id,
            "created in-memory container"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_requires_container() {
        let provider = MemoryProvider::new();
        let err = provider.open("inbox").await.unwrap_err();
        assert!(err.is_not_found());

        provider.create_container("inbox", None).await.unwrap();
        assert!(provider.container_exists("inbox").await.unwrap());
        assert!(provider.open("inbox").await.is_ok());
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let provider = MemoryProvider::new();
        provider.create_container("inbox", None).await.unwrap();
        let first = provider.open("inbox").await.unwrap();
        first
            .put(&"a.txt".into(), bytes::Bytes::from("a").into())
            .await
            .unwrap();

        provider.create_container("inbox", Some("eu")).await.unwrap();
        let second = provider.open("inbox").await.unwrap();
        assert!(second.head(&"a.txt".into()).await.is_ok());
    }
}

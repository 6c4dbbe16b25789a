//! Google Cloud Storage provider using [`object_store::gcp::GoogleCloudStorageBuilder`].

use std::sync::Arc;

use object_store::ObjectStore;
use object_store::gcp::GoogleCloudStorageBuilder;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::types::Error;

/// Typed credentials for Google Cloud Storage.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct GcsCredentials {
    /// Path to a JSON service account key file.
    #[serde(default)]
    pub service_account_path: Option<String>,
    /// Custom endpoint URL (for testing with a fake GCS server).
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Opens one GCS bucket per container.
#[derive(Debug, Clone)]
pub struct GcsProvider {
    creds: GcsCredentials,
}

impl GcsProvider {
    /// Creates a provider from credentials.
    pub fn new(creds: GcsCredentials) -> Self {
        Self { creds }
    }
}

#[async_trait::async_trait]
impl Provider for GcsProvider {
    fn id(&self) -> &'static str {
        "gcs"
    }

    async fn open(&self, container: &str) -> Result<Arc<dyn ObjectStore>, Error> {
        let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(container);

        if let Some(key_path) = &self.creds.service_account_path {
            builder = builder.with_service_account_path(key_path);
        }

        if let Some(endpoint) = &self.creds.endpoint {
            builder = builder.with_url(endpoint);
        }

        let store = builder
            .build()
            .map_err(|e| Error::connection(e.to_string(), self.id(), true))?;

        Ok(Arc::new(store))
    }
}

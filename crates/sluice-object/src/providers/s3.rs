//! S3-compatible provider using [`object_store::aws::AmazonS3Builder`].
//!
//! Works with AWS S3, MinIO, and any S3-compatible service. Each container
//! name is used as the bucket name.

use std::sync::Arc;

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::types::Error;

/// Typed credentials for S3-compatible provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct S3Credentials {
    /// AWS region (defaults to `us-east-1`).
    #[serde(default = "default_region")]
    pub region: String,
    /// Endpoint URL (e.g. `http://localhost:9000` for MinIO).
    /// Required for non-AWS S3-compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Access key ID for static credentials.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key for static credentials.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Session token for temporary credentials.
    #[serde(default)]
    pub session_token: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Opens one S3 bucket per container.
#[derive(Debug, Clone)]
pub struct S3Provider {
    creds: S3Credentials,
}

impl S3Provider {
    /// Creates a provider from credentials.
    pub fn new(creds: S3Credentials) -> Self {
        Self { creds }
    }
}

#[async_trait::async_trait]
impl Provider for S3Provider {
    fn id(&self) -> &'static str {
        "s3"
    }

    async fn open(&self, container: &str) -> Result<Arc<dyn ObjectStore>, Error> {
        let creds = &self.creds;
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(container)
            .with_region(&creds.region);

        if let Some(endpoint) = &creds.endpoint {
            builder = builder.with_endpoint(endpoint);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }

        if let Some(access_key) = &creds.access_key_id {
            builder = builder.with_access_key_id(access_key);
        }

        if let Some(secret_key) = &creds.secret_access_key {
            builder = builder.with_secret_access_key(secret_key);
        }

        if let Some(token) = &creds.session_token {
            builder = builder.with_token(token);
        }

        let store = builder
            .build()
            .map_err(|e| Error::connection(e.to_string(), self.id(), true))?;

        Ok(Arc::new(store))
    }
}

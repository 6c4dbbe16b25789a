//! Azure Blob Storage provider using [`object_store::azure::MicrosoftAzureBuilder`].

use std::sync::Arc;

use object_store::ObjectStore;
use object_store::azure::MicrosoftAzureBuilder;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::types::Error;

/// Typed credentials for Azure Blob Storage.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct AzureCredentials {
    /// Azure storage account name.
    pub account_name: String,
    /// Storage account access key.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Shared Access Signature token.
    #[serde(default)]
    pub sas_token: Option<String>,
    /// Custom endpoint URL (for Azure Stack or Azurite).
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Opens one Azure Blob container per container name.
#[derive(Debug, Clone)]
pub struct AzureProvider {
    creds: AzureCredentials,
}

impl AzureProvider {
    /// Creates a provider from credentials.
    pub fn new(creds: AzureCredentials) -> Self {
        Self { creds }
    }
}

/// Splits a SAS token query string into key/value pairs.
fn sas_pairs(sas: &str) -> Vec<(String, String)> {
    sas.trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            Some((
                parts.next()?.to_string(),
                parts.next().unwrap_or("").to_string(),
            ))
        })
        .collect()
}

#[async_trait::async_trait]
impl Provider for AzureProvider {
    fn id(&self) -> &'static str {
        "azure"
    }

    async fn open(&self, container: &str) -> Result<Arc<dyn ObjectStore>, Error> {
        let creds = &self.creds;
        let mut builder = MicrosoftAzureBuilder::new()
            .with_container_name(container)
            .with_account(&creds.account_name);

        if let Some(key) = &creds.access_key {
            builder = builder.with_access_key(key);
        }

        if let Some(sas) = &creds.sas_token {
            builder = builder.with_sas_authorization(sas_pairs(sas));
        }

        if let Some(endpoint) = &creds.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::connection(e.to_string(), self.id(), true))?;

        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sas_token_is_split() {
        let pairs = sas_pairs("?sv=2022-11-02&sig=abc%3D&flag");
        assert_eq!(
            pairs,
            vec![
                ("sv".to_string(), "2022-11-02".to_string()),
                ("sig".to_string(), "abc%3D".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}

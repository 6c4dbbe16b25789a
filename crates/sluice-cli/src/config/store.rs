//! Object store provider configuration.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, ensure};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use sluice_object::ObjectStoreClient;
use sluice_object::providers::{
    AzureCredentials, AzureProvider, GcsCredentials, GcsProvider, LocalProvider, MemoryProvider,
    S3Credentials, S3Provider,
};

use crate::TRACING_TARGET_CONFIG;

/// Supported object store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Process-local in-memory containers. Nothing survives a restart.
    Memory,
    /// One directory per container under `--store-local-root`.
    Local,
    /// Amazon S3 or a compatible service; one bucket per container.
    S3,
    /// Azure Blob Storage; one storage container per container.
    Azure,
    /// Google Cloud Storage; one bucket per container.
    Gcs,
}

/// Object store connection configuration.
///
/// Only the options of the selected provider are used. Secrets are never
/// serialized or logged.
#[derive(Clone, Serialize, Deserialize, Args)]
pub struct StoreConfig {
    /// Backend holding the consumed container.
    #[arg(
        long = "store-provider",
        env = "STORE_PROVIDER",
        value_enum,
        default_value_t = ProviderKind::Local
    )]
    pub provider: ProviderKind,

    /// Root directory of the `local` provider.
    #[arg(long = "store-local-root", env = "STORE_LOCAL_ROOT", default_value = "./data")]
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,

    /// S3 region.
    #[arg(long = "store-region", env = "STORE_REGION", default_value = "us-east-1")]
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services, Azurite or a GCS emulator.
    #[arg(long = "store-endpoint", env = "STORE_ENDPOINT")]
    #[serde(default)]
    pub endpoint: Option<String>,

    /// S3 access key id.
    #[arg(long = "store-access-key-id", env = "STORE_ACCESS_KEY_ID")]
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// S3 secret access key.
    #[arg(
        long = "store-secret-access-key",
        env = "STORE_SECRET_ACCESS_KEY",
        hide_env_values = true
    )]
    #[serde(default, skip_serializing)]
    pub secret_access_key: Option<String>,

    /// S3 session token for temporary credentials.
    #[arg(
        long = "store-session-token",
        env = "STORE_SESSION_TOKEN",
        hide_env_values = true
    )]
    #[serde(default, skip_serializing)]
    pub session_token: Option<String>,

    /// Azure storage account name.
    #[arg(long = "store-azure-account", env = "STORE_AZURE_ACCOUNT")]
    #[serde(default)]
    pub azure_account: Option<String>,

    /// Azure storage account access key.
    #[arg(
        long = "store-azure-access-key",
        env = "STORE_AZURE_ACCESS_KEY",
        hide_env_values = true
    )]
    #[serde(default, skip_serializing)]
    pub azure_access_key: Option<String>,

    /// Azure shared access signature.
    #[arg(
        long = "store-azure-sas-token",
        env = "STORE_AZURE_SAS_TOKEN",
        hide_env_values = true
    )]
    #[serde(default, skip_serializing)]
    pub azure_sas_token: Option<String>,

    /// Path to a GCS service account JSON file.
    #[arg(long = "store-gcs-service-account", env = "STORE_GCS_SERVICE_ACCOUNT")]
    #[serde(default)]
    pub gcs_service_account: Option<String>,
}

fn default_local_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

impl StoreConfig {
    /// Creates a configuration for `provider` with every option at its default.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            local_root: default_local_root(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            azure_account: None,
            azure_access_key: None,
            azure_sas_token: None,
            gcs_service_account: None,
        }
    }

    /// Validates the options of the selected provider.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.provider {
            ProviderKind::Memory | ProviderKind::Gcs => {}
            ProviderKind::Local => {
                ensure!(
                    !self.local_root.as_os_str().is_empty(),
                    "local provider requires a root directory"
                );
                if self.local_root.exists() && !self.local_root.is_dir() {
                    bail!(
                        "local root '{}' exists and is not a directory",
                        self.local_root.display()
                    );
                }
            }
            ProviderKind::S3 => {
                ensure!(!self.region.trim().is_empty(), "S3 provider requires a region");
                ensure!(
                    self.access_key_id.is_some() == self.secret_access_key.is_some(),
                    "S3 access key id and secret access key must be set together"
                );
            }
            ProviderKind::Azure => {
                ensure!(
                    self.azure_account.as_deref().is_some_and(|a| !a.trim().is_empty()),
                    "Azure provider requires a storage account name"
                );
            }
        }
        Ok(())
    }

    /// Creates a client for the selected provider.
    ///
    /// Containers are opened lazily, so no connection is made here.
    pub fn connect(&self) -> anyhow::Result<ObjectStoreClient> {
        let client = match self.provider {
            ProviderKind::Memory => ObjectStoreClient::new(MemoryProvider::new()),
            ProviderKind::Local => ObjectStoreClient::new(LocalProvider::new(&self.local_root)),
            ProviderKind::S3 => ObjectStoreClient::new(S3Provider::new(S3Credentials {
                region: self.region.clone(),
                endpoint: self.endpoint.clone(),
                access_key_id: self.access_key_id.clone(),
                secret_access_key: self.secret_access_key.clone(),
                session_token: self.session_token.clone(),
            })),
            ProviderKind::Azure => {
                let Some(account_name) = self.azure_account.clone() else {
                    bail!("Azure provider requires a storage account name");
                };
                ObjectStoreClient::new(AzureProvider::new(AzureCredentials {
                    account_name,
                    access_key: self.azure_access_key.clone(),
                    sas_token: self.azure_sas_token.clone(),
                    endpoint: self.endpoint.clone(),
                }))
            }
            ProviderKind::Gcs => ObjectStoreClient::new(GcsProvider::new(GcsCredentials {
                service_account_path: self.gcs_service_account.clone(),
                endpoint: self.endpoint.clone(),
            })),
        };
        Ok(client)
    }

    /// Logs the store configuration without credentials.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            provider = ?self.provider,
            local_root = %self.local_root.display(),
            region = %self.region,
            endpoint = ?self.endpoint,
            has_credentials = self.has_credentials(),
            "Store configuration"
        );
    }

    fn has_credentials(&self) -> bool {
        self.secret_access_key.is_some()
            || self.azure_access_key.is_some()
            || self.azure_sas_token.is_some()
            || self.gcs_service_account.is_some()
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("provider", &self.provider)
            .field("local_root", &self.local_root)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("azure_account", &self.azure_account)
            .field("gcs_service_account", &self.gcs_service_account)
            .finish_non_exhaustive()
    }
}

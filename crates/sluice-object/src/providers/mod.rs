//! Provider trait and container providers.

mod azure;
mod gcs;
mod local;
mod memory;
mod provider;
mod s3;

pub use azure::{AzureCredentials, AzureProvider};
pub use gcs::{GcsCredentials, GcsProvider};
pub use local::{LocalCredentials, LocalProvider};
pub use memory::MemoryProvider;
pub use provider::Provider;
pub use s3::{S3Credentials, S3Provider};

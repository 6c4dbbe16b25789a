//! Convenience re-exports.

pub use crate::client::{GetOutput, ObjectStoreClient, PutOutput};
pub use crate::providers::{
    AzureProvider, GcsProvider, LocalProvider, MemoryProvider, Provider, S3Provider,
};
pub use crate::store::{BlobStore, ensure_container_exists};
pub use crate::types::{Error, ListOptions, StorageKind, StorageMetadata};

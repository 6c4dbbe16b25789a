#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod client;
/// Container providers backed by `object_store` implementations.
pub mod providers;
mod store;
/// Error, listing options and storage metadata.
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use client::{GetOutput, ObjectStoreClient, PutOutput};
pub use providers::Provider;
pub use store::{BlobStore, ensure_container_exists};
pub use types::{Error, ListOptions, StorageKind, StorageMetadata};

/// Tracing target for object store operations.
pub const TRACING_TARGET: &str = "sluice_object";

//! Error, listing options and storage metadata.

pub mod error;
pub mod list_options;
pub mod storage_metadata;

pub use error::Error;
pub use list_options::ListOptions;
pub use storage_metadata::{FOLDER_MARKER_SUFFIX, StorageKind, StorageMetadata};

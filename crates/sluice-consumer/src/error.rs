//! Consumer error types.

use std::borrow::Cow;

use crate::processor::ProcessError;

/// Result type alias for consumer operations.
pub type Result<T, E = ConsumerError> = std::result::Result<T, E>;

/// Consumer error type.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// Listing, reading, removing or bootstrapping the store failed.
    #[error("store operation failed: {0}")]
    Store(#[from] sluice_object::Error),

    /// The downstream processor reported a failure for an item.
    #[error("processing '{source_name}' failed: {source}")]
    Processing {
        source_name: String,
        #[source]
        source: ProcessError,
    },

    /// A work item could not be built from a store entry.
    #[error("invalid work item: {0}")]
    InvalidItem(Cow<'static, str>),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),

    /// The consumer is not in a state that allows the operation.
    #[error("consumer is not running")]
    NotRunning,
}

impl ConsumerError {
    /// Creates an invalid item error.
    pub fn invalid_item(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidItem(message.into())
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether retrying the poll cycle later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::Processing { source, .. } => source.is_retryable(),
            Self::InvalidItem(_) | Self::InvalidConfig(_) | Self::NotRunning => false,
        }
    }
}

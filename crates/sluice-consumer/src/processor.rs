//! Downstream processor capability.

use std::borrow::Cow;
use std::sync::Arc;

use crate::message::WorkItem;

/// Failure reported by a [`Processor`] for a single item.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProcessError {
    message: Cow<'static, str>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    retryable: bool,
}

impl ProcessError {
    /// Creates a processing error with a message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            source: None,
            retryable: true,
        }
    }

    /// Creates a processing error with a message and source.
    pub fn with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
            retryable: true,
        }
    }

    /// Marks the failure as permanent: redelivering the item will not help.
    pub fn permanent(mut self) -> Self {
        self.retryable = false;
        self
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether redelivering the item may succeed.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Receives work items one at a time.
///
/// The outcome is returned as a value and checked by the batch processor
/// right after the call: on `Err` the batch stops and the item's source
/// object stays in the store for redelivery.
#[async_trait::async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Processes one item.
    async fn process(&self, item: &mut WorkItem) -> Result<(), ProcessError>;
}

#[async_trait::async_trait]
impl<P: Processor + ?Sized> Processor for Arc<P> {
    async fn process(&self, item: &mut WorkItem) -> Result<(), ProcessError> {
        (**self).process(item).await
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    #[test]
    fn process_error_keeps_source() {
        let err = ProcessError::with_source("write failed", io::Error::other("disk full"));
        assert_eq!(err.to_string(), "write failed");
        assert_eq!(err.message(), "write failed");
        assert!(err.source().is_some());
        assert!(err.is_retryable());
    }

    #[test]
    fn permanent_is_not_retryable() {
        let err = ProcessError::new("malformed payload").permanent();
        assert!(!err.is_retryable());
    }
}

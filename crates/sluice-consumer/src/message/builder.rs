//! Converts store entries into work items.

use sluice_object::{GetOutput, StorageMetadata};

use super::{StreamCache, WorkItem};
use crate::error::{ConsumerError, Result};

/// Builds [`WorkItem`]s for one container.
#[derive(Debug, Clone)]
pub struct WorkItemBuilder {
    container: String,
}

impl WorkItemBuilder {
    /// Creates a builder for items read from `container`.
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
        }
    }

    /// Builds an item from a listing entry and the fetched object.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::InvalidItem`] when the entry has no name.
    pub fn build(&self, meta: &StorageMetadata, output: GetOutput) -> Result<WorkItem> {
        if meta.name.is_empty() {
            return Err(ConsumerError::invalid_item(
                "cannot build a work item from an unnamed object",
            ));
        }

        Ok(WorkItem::new(
            self.container.clone(),
            meta.name.clone(),
            StreamCache::from(output.data),
            output.content_type,
        ))
    }
}

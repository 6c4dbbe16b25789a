//! Batch sources feeding a [`BatchConsumer`](crate::BatchConsumer).

mod blob;

use std::collections::VecDeque;

pub use blob::BlobStoreSource;

use crate::error::Result;
use crate::message::WorkItem;

/// Supplies batches of work and acknowledges processed items.
///
/// The consumer calls [`fetch`](Self::fetch) once per poll cycle and
/// [`commit`](Self::commit) after each item the processor accepted.
/// `fetch` must not acknowledge anything itself.
#[async_trait::async_trait]
pub trait BatchSource: Send + Sync + 'static {
    /// Prepares the source before the first poll.
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Fetches at most `max` items, in delivery order. Zero means unbounded.
    async fn fetch(&self, max: usize) -> Result<VecDeque<WorkItem>>;

    /// Acknowledges a successfully processed item.
    async fn commit(&self, item: &WorkItem) -> Result<()>;

    /// Called when the lifecycle manager prepares to shut the consumer down.
    fn prepare_shutdown(&self) {}
}

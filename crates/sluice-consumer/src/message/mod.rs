//! Work items and the replayable body cache.

mod builder;
mod stream_cache;
mod work_item;

pub use builder::WorkItemBuilder;
pub use stream_cache::StreamCache;
pub use work_item::{BatchInfo, WorkItem};

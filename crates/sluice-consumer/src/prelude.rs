//! Convenient re-exports for consumer wiring.

pub use crate::config::{ConsumerConfig, SchedulerConfig, ShutdownConfig};
pub use crate::consumer::BatchConsumer;
pub use crate::error::{ConsumerError, Result};
pub use crate::lifecycle::{Lifecycle, ShutdownAware, ShutdownRunningTask, Status};
pub use crate::message::WorkItem;
pub use crate::processor::{ProcessError, Processor};
pub use crate::runtime::{GracefulShutdown, PollScheduler, SchedulerHandle};
pub use crate::source::{BatchSource, BlobStoreSource};

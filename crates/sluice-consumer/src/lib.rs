#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
mod consumer;
mod error;
pub mod lifecycle;
pub mod message;
mod processor;
pub mod runtime;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use config::{ConsumerConfig, SchedulerConfig, ShutdownConfig};
pub use consumer::BatchConsumer;
pub use error::{ConsumerError, Result};
pub use lifecycle::{Lifecycle, ShutdownAware, ShutdownRunningTask, Status};
pub use message::{BatchInfo, StreamCache, WorkItem};
pub use processor::{ProcessError, Processor};
pub use runtime::{GracefulShutdown, PollScheduler, SchedulerHandle, SchedulerReport, ShutdownReport};
pub use source::{BatchSource, BlobStoreSource};

/// Tracing target for poll cycles.
pub const TRACING_TARGET_POLL: &str = "sluice_consumer::poll";

/// Tracing target for batch draining.
pub const TRACING_TARGET_BATCH: &str = "sluice_consumer::batch";

/// Tracing target for shutdown negotiation.
pub const TRACING_TARGET_SHUTDOWN: &str = "sluice_consumer::shutdown";

/// Tracing target for the poll scheduler.
pub const TRACING_TARGET_SCHEDULER: &str = "sluice_consumer::scheduler";

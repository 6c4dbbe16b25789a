//! Consumer, scheduler and shutdown configuration.
//!
//! Every type derives `serde` and, with the `config` feature, `clap::Args`
//! so a binary can flatten them into its command line.

mod consumer;
mod scheduler;
mod shutdown;

pub use consumer::{ConsumerConfig, DEFAULT_MAX_MESSAGES_PER_POLL};
pub use scheduler::{DEFAULT_DELAY_MS, DEFAULT_INITIAL_DELAY_MS, SchedulerConfig};
pub use shutdown::{DEFAULT_CHECK_INTERVAL_MS, DEFAULT_SHUTDOWN_TIMEOUT_SECS, ShutdownConfig};

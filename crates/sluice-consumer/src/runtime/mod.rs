//! Poll scheduling and graceful shutdown.

mod scheduler;
mod shutdown;

pub use scheduler::{PollScheduler, SchedulerHandle, SchedulerReport};
pub use shutdown::{GracefulShutdown, ShutdownReport};

//! Run state and shutdown negotiation.

mod shutdown;
mod status;

pub use shutdown::{PollingGuard, ShutdownAware, ShutdownRunningTask, ShutdownState};
pub use status::{Lifecycle, ServiceStatus, Status};

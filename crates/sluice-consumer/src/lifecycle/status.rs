//! Consumer run state.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle states of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Status {
    /// Not running. Initial and final state.
    Stopped = 0,
    /// Bootstrapping its source.
    Starting = 1,
    /// Polling on schedule.
    Started = 2,
    /// No new polls are scheduled; an in-flight batch may still drain.
    Suspended = 3,
    /// Shutting down; in-flight batches stop at the next item.
    Stopping = 4,
}

impl Status {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Started,
            3 => Self::Suspended,
            4 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// Whether batch work may continue in this state.
    pub fn is_run_allowed(self) -> bool {
        matches!(self, Self::Started | Self::Suspended)
    }
}

/// Atomically updated [`Status`], readable from any task without locking.
///
/// Accesses are sequentially consistent so that a status write and the
/// poll flag of [`ShutdownState`](super::ShutdownState) are observed in one
/// global order by `stop()` and the end of a poll cycle.
#[derive(Debug)]
pub struct ServiceStatus(AtomicU8);

impl ServiceStatus {
    /// Creates a stopped status.
    pub fn new() -> Self {
        Self(AtomicU8::new(Status::Stopped as u8))
    }

    /// Current status.
    pub fn get(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Unconditionally sets the status.
    pub fn set(&self, status: Status) {
        self.0.store(status as u8, Ordering::SeqCst);
    }

    /// Moves from `from` to `to`, returning `false` if the status was not `from`.
    pub fn transition(&self, from: Status, to: Status) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether batch work may continue.
    pub fn is_run_allowed(&self) -> bool {
        self.get().is_run_allowed()
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous lifecycle controls used by the shutdown strategy.
pub trait Lifecycle: Send + Sync {
    /// Current status.
    fn status(&self) -> Status;

    /// Stops scheduling new polls without abandoning in-flight work.
    fn suspend(&self);

    /// Resumes scheduling after [`suspend`](Self::suspend).
    fn resume(&self);

    /// Stops the consumer; in-flight batches halt at the next iteration.
    fn stop(&self);
}

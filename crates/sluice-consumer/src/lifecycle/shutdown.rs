//! Shutdown negotiation between a consumer and its lifecycle manager.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// How much in-flight batch work to finish once shutdown is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownRunningTask {
    /// Finish the item being processed, leave the rest of the batch in the store.
    #[default]
    CompleteCurrentTaskOnly,
    /// Finish every item of the current batch.
    CompleteAllTasks,
}

impl ShutdownRunningTask {
    fn as_u8(self) -> u8 {
        match self {
            Self::CompleteCurrentTaskOnly => 1,
            Self::CompleteAllTasks => 2,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::CompleteCurrentTaskOnly),
            2 => Some(Self::CompleteAllTasks),
            _ => None,
        }
    }
}

/// Implemented by consumers that take part in graceful shutdown.
pub trait ShutdownAware: Send + Sync {
    /// Records how to treat pending work.
    ///
    /// Returns `true` to ask the lifecycle manager to postpone the shutdown
    /// signal itself.
    fn defer_shutdown(&self, mode: ShutdownRunningTask) -> bool;

    /// Number of items the lifecycle manager should still wait for.
    fn pending_exchanges_size(&self) -> usize;

    /// Hook invoked right before the consumer is suspended.
    fn prepare_shutdown(&self) {}
}

/// Shutdown bookkeeping of one consumer.
///
/// Written by the polling task and read by the lifecycle manager. Each field
/// is an independent atomic; readers tolerate momentary skew between them.
/// The polling flag is sequentially consistent, pairing with
/// [`ServiceStatus`](super::ServiceStatus).
#[derive(Debug, Default)]
pub struct ShutdownState {
    mode: AtomicU8,
    pending: AtomicUsize,
    polling: AtomicBool,
}

impl ShutdownState {
    /// Creates a state with no shutdown requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the recorded mode and the pending count.
    pub fn reset(&self) {
        self.mode.store(0, Ordering::Release);
        self.pending.store(0, Ordering::Release);
    }

    /// Records the requested mode. The last caller wins.
    pub fn set_mode(&self, mode: ShutdownRunningTask) {
        self.mode.store(mode.as_u8(), Ordering::Release);
    }

    /// Recorded mode, `None` when no shutdown was requested.
    pub fn mode(&self) -> Option<ShutdownRunningTask> {
        ShutdownRunningTask::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Updates the number of items left in the current batch.
    pub fn set_pending(&self, pending: usize) {
        self.pending.store(pending, Ordering::Release);
    }

    /// Raw number of items left in the current batch.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether a poll cycle is in flight.
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Marks a poll cycle as in flight until the guard is dropped.
    pub fn begin_poll(&self) -> PollingGuard<'_> {
        self.polling.store(true, Ordering::SeqCst);
        PollingGuard { state: self }
    }

    /// Whether the drain loop may start its next item.
    pub fn allows_next_item(&self) -> bool {
        match self.mode() {
            None => true,
            Some(mode) => mode == ShutdownRunningTask::CompleteAllTasks,
        }
    }

    /// Pending count as reported to the lifecycle manager.
    ///
    /// Only [`CompleteAllTasks`](ShutdownRunningTask::CompleteAllTasks) reports
    /// the real count. While a poll is in flight at least 1 is reported: items
    /// fetched by the poll are not yet counted until the drain loop reaches them.
    pub fn pending_exchanges_size(&self) -> usize {
        let pending = match self.mode() {
            Some(ShutdownRunningTask::CompleteAllTasks) => self.pending(),
            _ => 0,
        };

        if pending == 0 && self.is_polling() {
            1
        } else {
            pending
        }
    }
}

/// Clears the polling flag of a [`ShutdownState`] on drop.
#[derive(Debug)]
pub struct PollingGuard<'a> {
    state: &'a ShutdownState,
}

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.state.polling.store(false, Ordering::SeqCst);
    }
}

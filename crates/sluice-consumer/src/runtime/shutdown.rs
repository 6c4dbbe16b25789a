//! Graceful shutdown of a scheduled consumer.

use std::time::Duration;

use tokio::time::Instant;

use super::scheduler::{SchedulerHandle, SchedulerReport};
use crate::TRACING_TARGET_SHUTDOWN;
use crate::config::ShutdownConfig;
use crate::lifecycle::{Lifecycle, ShutdownAware};

/// Outcome of [`GracefulShutdown::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether pending work was abandoned because the timeout elapsed.
    pub timed_out: bool,
    /// Time spent shutting down.
    pub elapsed: Duration,
    /// Counters of the scheduler task, `None` if it was aborted.
    pub scheduler: Option<SchedulerReport>,
}

/// Negotiates shutdown with a consumer and its scheduler task.
///
/// The consumer is told which in-flight work to finish, suspended so no new
/// poll starts, and given until the timeout to report no pending work. On
/// timeout it is stopped and the scheduler task is aborted.
#[derive(Debug, Clone, Default)]
pub struct GracefulShutdown {
    config: ShutdownConfig,
}

impl GracefulShutdown {
    /// Creates a shutdown strategy.
    pub fn new(config: ShutdownConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    /// Shuts `consumer` down and waits for its scheduler task.
    pub async fn shutdown<C>(&self, consumer: &C, handle: SchedulerHandle) -> ShutdownReport
    where
        C: ShutdownAware + Lifecycle + ?Sized,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout();

        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            mode = ?self.config.mode,
            timeout_secs = self.config.timeout_secs,
            "shutting down consumer"
        );

        if consumer.defer_shutdown(self.config.mode) {
            tracing::debug!(target: TRACING_TARGET_SHUTDOWN, "consumer asked to defer shutdown");
        }
        consumer.prepare_shutdown();
        consumer.suspend();
        handle.cancel();

        loop {
            let pending = consumer.pending_exchanges_size();
            if pending == 0 && handle.is_finished() {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    target: TRACING_TARGET_SHUTDOWN,
                    pending,
                    timeout_secs = self.config.timeout_secs,
                    "shutdown timed out, forcing stop"
                );
                consumer.stop();
                handle.abort();
                let scheduler = handle.join().await;
                return ShutdownReport {
                    timed_out: true,
                    elapsed: started.elapsed(),
                    scheduler,
                };
            }

            if pending > 0 {
                tracing::info!(
                    target: TRACING_TARGET_SHUTDOWN,
                    pending,
                    remaining_ms = (deadline - now).as_millis() as u64,
                    "waiting for pending work"
                );
            }
            tokio::time::sleep(self.config.check_interval().min(deadline - now)).await;
        }

        let scheduler = handle.join().await;
        consumer.stop();

        let elapsed = started.elapsed();
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            elapsed_ms = elapsed.as_millis() as u64,
            "consumer shut down"
        );
        ShutdownReport {
            timed_out: false,
            elapsed,
            scheduler,
        }
    }
}

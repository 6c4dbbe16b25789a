//! Fixed-delay poll scheduler.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_SCHEDULER;
use crate::config::SchedulerConfig;
use crate::consumer::BatchConsumer;
use crate::lifecycle::Status;
use crate::source::BatchSource;

/// Counters collected by a scheduler task over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerReport {
    /// Poll cycles run.
    pub polls: u64,
    /// Items handed to the processor.
    pub items: u64,
    /// Poll cycles that returned an error.
    pub errors: u64,
    /// Runs skipped because of backoff.
    pub skipped: u64,
}

/// Drives [`BatchConsumer::poll`] on a fixed delay.
///
/// Poll cycles never overlap and are never interrupted: cancellation is only
/// observed while waiting between cycles. Runs are skipped while the consumer
/// is not [`Started`](Status::Started).
pub struct PollScheduler<S> {
    consumer: Arc<BatchConsumer<S>>,
    config: SchedulerConfig,
}

impl<S: BatchSource> PollScheduler<S> {
    /// Creates a scheduler for `consumer`.
    pub fn new(consumer: Arc<BatchConsumer<S>>, config: SchedulerConfig) -> Self {
        Self { consumer, config }
    }

    /// Spawns the polling task on the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> SchedulerHandle {
        let task = tokio::spawn(run(self.consumer, self.config, cancel.clone()));
        SchedulerHandle { cancel, task }
    }
}

/// Handle to a spawned scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<SchedulerReport>,
}

impl SchedulerHandle {
    /// Asks the task to exit after the current poll cycle.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Aborts the task, dropping an in-flight poll cycle at its next await.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the task to exit.
    ///
    /// Returns `None` when the task was aborted or panicked.
    pub async fn join(self) -> Option<SchedulerReport> {
        match self.task.await {
            Ok(report) => Some(report),
            Err(err) if err.is_cancelled() => {
                tracing::debug!(target: TRACING_TARGET_SCHEDULER, "scheduler task aborted");
                None
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_SCHEDULER,
                    error = %err,
                    "scheduler task panicked"
                );
                None
            }
        }
    }
}

/// Idle and error streaks driving backoff.
#[derive(Debug, Default)]
struct Backoff {
    multiplier: u32,
    idle_threshold: u32,
    error_threshold: u32,
    idle: u32,
    errors: u32,
    skipped: u32,
}

impl Backoff {
    fn new(config: &SchedulerConfig) -> Self {
        Self {
            multiplier: config.backoff_multiplier,
            idle_threshold: config.backoff_idle_threshold,
            error_threshold: config.backoff_error_threshold,
            ..Self::default()
        }
    }

    /// Whether this run should be skipped. Resets the streaks once
    /// `multiplier` runs were skipped.
    fn should_skip(&mut self) -> bool {
        if self.multiplier == 0 {
            return false;
        }

        let idle = self.idle_threshold > 0 && self.idle >= self.idle_threshold;
        let error = self.error_threshold > 0 && self.errors >= self.error_threshold;
        if !idle && !error {
            return false;
        }

        if self.skipped < self.multiplier {
            self.skipped += 1;
            return true;
        }

        self.idle = 0;
        self.errors = 0;
        self.skipped = 0;
        false
    }

    fn record_success(&mut self, items: usize) {
        self.idle = if items == 0 { self.idle.saturating_add(1) } else { 0 };
        self.errors = 0;
    }

    fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
        self.idle = 0;
    }
}

/// Sleeps for `duration`, returning `false` if cancelled first.
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

async fn run<S: BatchSource>(
    consumer: Arc<BatchConsumer<S>>,
    config: SchedulerConfig,
    cancel: CancellationToken,
) -> SchedulerReport {
    let mut report = SchedulerReport::default();
    let mut backoff = Backoff::new(&config);

    tracing::info!(
        target: TRACING_TARGET_SCHEDULER,
        initial_delay_ms = config.initial_delay_ms,
        delay_ms = config.delay_ms,
        greedy = config.greedy,
        "poll scheduler started"
    );

    if !sleep_or_cancel(&cancel, config.initial_delay()).await {
        tracing::info!(target: TRACING_TARGET_SCHEDULER, "poll scheduler cancelled");
        return report;
    }

    while !cancel.is_cancelled() {
        let mut found_work = false;

        if consumer.status() != Status::Started {
            tracing::trace!(
                target: TRACING_TARGET_SCHEDULER,
                status = ?consumer.status(),
                "consumer not started, skipping run"
            );
        } else if backoff.should_skip() {
            report.skipped += 1;
            tracing::trace!(target: TRACING_TARGET_SCHEDULER, "backing off, skipping run");
        } else {
            report.polls += 1;
            match consumer.poll().await {
                Ok(items) => {
                    report.items += items as u64;
                    found_work = items > 0;
                    backoff.record_success(items);
                }
                Err(err) => {
                    report.errors += 1;
                    backoff.record_error();
                    tracing::error!(
                        target: TRACING_TARGET_SCHEDULER,
                        error = %err,
                        retryable = err.is_retryable(),
                        poll = report.polls,
                        "poll cycle failed"
                    );
                }
            }
        }

        if config.greedy && found_work {
            continue;
        }

        if !sleep_or_cancel(&cancel, config.delay()).await {
            break;
        }
    }

    tracing::info!(
        target: TRACING_TARGET_SCHEDULER,
        polls = report.polls,
        items = report.items,
        errors = report.errors,
        "poll scheduler stopped"
    );
    report
}

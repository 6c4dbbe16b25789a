//! Poll scheduling configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default wait before the first poll, in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

/// Default wait between polls, in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 500;

/// How often and how eagerly a consumer is polled.
///
/// # Backoff
///
/// With a non-zero `backoff_multiplier`, reaching `backoff_idle_threshold`
/// consecutive empty polls or `backoff_error_threshold` consecutive failed
/// polls skips the next `backoff_multiplier` runs. A zero threshold disables
/// its trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct SchedulerConfig {
    /// Wait before the first poll, in milliseconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "scheduler-initial-delay-ms",
            env = "SCHEDULER_INITIAL_DELAY_MS",
            default_value_t = DEFAULT_INITIAL_DELAY_MS
        )
    )]
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Wait between polls, in milliseconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "scheduler-delay-ms",
            env = "SCHEDULER_DELAY_MS",
            default_value_t = DEFAULT_DELAY_MS
        )
    )]
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Poll again immediately when the previous poll found work.
    #[cfg_attr(
        feature = "config",
        arg(long = "scheduler-greedy", env = "SCHEDULER_GREEDY")
    )]
    #[serde(default)]
    pub greedy: bool,

    /// Number of runs to skip once a backoff threshold is reached.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "scheduler-backoff-multiplier",
            env = "SCHEDULER_BACKOFF_MULTIPLIER",
            default_value_t = 0
        )
    )]
    #[serde(default)]
    pub backoff_multiplier: u32,

    /// Consecutive empty polls that trigger a backoff.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "scheduler-backoff-idle-threshold",
            env = "SCHEDULER_BACKOFF_IDLE_THRESHOLD",
            default_value_t = 0
        )
    )]
    #[serde(default)]
    pub backoff_idle_threshold: u32,

    /// Consecutive failed polls that trigger a backoff.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "scheduler-backoff-error-threshold",
            env = "SCHEDULER_BACKOFF_ERROR_THRESHOLD",
            default_value_t = 0
        )
    )]
    #[serde(default)]
    pub backoff_error_threshold: u32,
}

fn default_initial_delay_ms() -> u64 {
    DEFAULT_INITIAL_DELAY_MS
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            delay_ms: DEFAULT_DELAY_MS,
            greedy: false,
            backoff_multiplier: 0,
            backoff_idle_threshold: 0,
            backoff_error_threshold: 0,
        }
    }
}

impl SchedulerConfig {
    /// Sets the wait before the first poll.
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay_ms = duration_to_ms(initial_delay);
        self
    }

    /// Sets the wait between polls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = duration_to_ms(delay);
        self
    }

    /// Enables or disables greedy polling.
    pub fn with_greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;
        self
    }

    /// Configures backoff: skip `multiplier` runs after `idle` empty or
    /// `error` failed polls in a row.
    pub fn with_backoff(mut self, multiplier: u32, idle: u32, error: u32) -> Self {
        self.backoff_multiplier = multiplier;
        self.backoff_idle_threshold = idle;
        self.backoff_error_threshold = error;
        self
    }

    /// Wait before the first poll.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Wait between polls.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Whether any backoff trigger is active.
    pub fn backoff_enabled(&self) -> bool {
        self.backoff_multiplier > 0
            && (self.backoff_idle_threshold > 0 || self.backoff_error_threshold > 0)
    }

    /// Validates the configuration.
    ///
    /// Every combination of values is currently accepted; a backoff
    /// multiplier without thresholds is logged and has no effect.
    pub fn validate(&self) -> Result<()> {
        if self.backoff_multiplier > 0 && !self.backoff_enabled() {
            tracing::warn!(
                target: crate::TRACING_TARGET_SCHEDULER,
                backoff_multiplier = self.backoff_multiplier,
                "backoff multiplier set without an idle or error threshold"
            );
        }
        Ok(())
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

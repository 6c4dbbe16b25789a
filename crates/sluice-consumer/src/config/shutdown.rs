//! Graceful shutdown configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::{ConsumerError, Result};
use crate::lifecycle::ShutdownRunningTask;

/// Default time to wait for pending work, in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 45;

/// Default interval between pending-work checks, in milliseconds.
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 1000;

/// How long and how much to drain on shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ShutdownConfig {
    /// Time to wait for pending work before forcing a stop, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "shutdown-timeout-secs",
            env = "SHUTDOWN_TIMEOUT_SECS",
            default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS
        )
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between pending-work checks, in milliseconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "shutdown-check-interval-ms",
            env = "SHUTDOWN_CHECK_INTERVAL_MS",
            default_value_t = DEFAULT_CHECK_INTERVAL_MS
        )
    )]
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Whether to finish the whole in-flight batch or only the current item.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "shutdown-mode",
            env = "SHUTDOWN_MODE",
            value_enum,
            default_value_t = ShutdownRunningTask::CompleteCurrentTaskOnly
        )
    )]
    #[serde(default)]
    pub mode: ShutdownRunningTask,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_check_interval_ms() -> u64 {
    DEFAULT_CHECK_INTERVAL_MS
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            mode: ShutdownRunningTask::default(),
        }
    }
}

impl ShutdownConfig {
    /// Sets the drain mode.
    pub fn with_mode(mut self, mode: ShutdownRunningTask) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the drain timeout in seconds.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the check interval.
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval_ms = u64::try_from(check_interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Time to wait for pending work.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Interval between pending-work checks.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::InvalidConfig`] for a zero timeout or a zero
    /// check interval.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ConsumerError::invalid_config(
                "shutdown timeout must be at least 1 second",
            ));
        }
        if self.check_interval_ms == 0 {
            return Err(ConsumerError::invalid_config(
                "shutdown check interval must be at least 1 millisecond",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ShutdownConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(45));
        assert_eq!(config.check_interval(), Duration::from_secs(1));
        assert_eq!(config.mode, ShutdownRunningTask::CompleteCurrentTaskOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ShutdownConfig::default()
            .with_timeout_secs(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConsumerError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_check_interval() {
        let config = ShutdownConfig::default().with_check_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}

//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── store: StoreConfig          # Provider selection and credentials
//! ├── consumer: ConsumerConfig    # Container, directory, batch bound
//! ├── scheduler: SchedulerConfig  # Delays, greedy polling, backoff
//! ├── shutdown: ShutdownConfig    # Drain mode and timeout
//! ├── sink: SinkConfig            # Where delivered objects go
//! └── telemetry: TelemetryConfig  # Log output format
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! sluice --store-provider local --store-local-root ./data --consumer-container inbox
//!
//! # Or via environment variables
//! STORE_PROVIDER=local STORE_LOCAL_ROOT=./data CONSUMER_CONTAINER=inbox sluice
//! ```

mod sink;
mod store;
mod telemetry;

use std::process;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
pub use sink::SinkConfig;
use sluice_consumer::{ConsumerConfig, SchedulerConfig, ShutdownConfig};
pub use store::{ProviderKind, StoreConfig};
pub use telemetry::TelemetryConfig;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "sluice")]
#[command(about = "Batch-polling blob store consumer")]
#[command(version)]
pub struct Cli {
    /// Object store provider and credentials.
    #[clap(flatten)]
    pub store: StoreConfig,

    /// Container to consume and batch bound.
    #[clap(flatten)]
    pub consumer: ConsumerConfig,

    /// Poll scheduling.
    #[clap(flatten)]
    pub scheduler: SchedulerConfig,

    /// Graceful shutdown.
    #[clap(flatten)]
    pub shutdown: ShutdownConfig,

    /// Delivery sink.
    #[clap(flatten)]
    pub sink: SinkConfig,

    /// Log output.
    #[clap(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments so its variables
    /// act as defaults for `env` fallbacks.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.store
            .validate()
            .context("invalid store configuration")?;
        self.consumer
            .validate()
            .context("invalid consumer configuration")?;
        self.scheduler
            .validate()
            .context("invalid scheduler configuration")?;
        self.shutdown
            .validate()
            .context("invalid shutdown configuration")?;
        self.sink.validate().context("invalid sink configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.store.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            container = %self.consumer.container,
            directory = ?self.consumer.directory,
            max_messages_per_poll = self.consumer.max_messages_per_poll,
            "Consumer configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            initial_delay_ms = self.scheduler.initial_delay_ms,
            delay_ms = self.scheduler.delay_ms,
            greedy = self.scheduler.greedy,
            backoff_multiplier = self.scheduler.backoff_multiplier,
            "Scheduler configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            mode = ?self.shutdown.mode,
            timeout_secs = self.shutdown.timeout_secs,
            check_interval_ms = self.shutdown.check_interval_ms,
            "Shutdown configuration"
        );

        self.sink.log();
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::info!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            "starting sluice"
        );

        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use sluice_consumer::ShutdownRunningTask;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags_into_nested_configs() {
        let cli = Cli::try_parse_from([
            "sluice",
            "--store-provider",
            "memory",
            "--consumer-container",
            "inbox",
            "--consumer-max-messages-per-poll",
            "25",
            "--scheduler-greedy",
            "--shutdown-mode",
            "complete-all-tasks",
        ])
        .unwrap();

        assert_eq!(cli.store.provider, ProviderKind::Memory);
        assert_eq!(cli.consumer.container, "inbox");
        assert_eq!(cli.consumer.max_messages_per_poll, 25);
        assert!(cli.scheduler.greedy);
        assert_eq!(cli.shutdown.mode, ShutdownRunningTask::CompleteAllTasks);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn rejects_zero_shutdown_timeout() {
        let cli = Cli::try_parse_from([
            "sluice",
            "--store-provider",
            "memory",
            "--consumer-container",
            "inbox",
            "--shutdown-timeout-secs",
            "0",
        ])
        .unwrap();

        let err = cli.validate().unwrap_err();
        assert!(format!("{err:#}").contains("shutdown"));
    }
}

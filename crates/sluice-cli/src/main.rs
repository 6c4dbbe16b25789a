#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod sink;
mod telemetry;
mod worker;

use std::process;

use anyhow::Context;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "sluice_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "sluice_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "sluice_cli::config";
pub const TRACING_TARGET_SINK: &str = "sluice_cli::sink";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing(&cli.telemetry)?;
    cli.log();
    cli.validate()?;

    let store = cli
        .store
        .connect()
        .context("failed to configure object store")?;
    let processor = cli.sink.build().await.context("failed to prepare sink")?;

    worker::run(cli, store, processor).await
}

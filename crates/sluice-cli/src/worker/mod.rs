//! Consumer wiring and lifecycle.

mod shutdown;

use std::sync::Arc;

use anyhow::Context;
use shutdown::shutdown_signal;
use sluice_consumer::{BatchConsumer, BlobStoreSource, GracefulShutdown, PollScheduler, Processor};
use sluice_object::ObjectStoreClient;
use tokio_util::sync::CancellationToken;

use crate::config::Cli;
use crate::{TRACING_TARGET_SHUTDOWN, TRACING_TARGET_STARTUP};

/// Runs the consumer until a shutdown signal, then shuts it down gracefully.
///
/// # Errors
///
/// Returns an error if the consumer cannot be started, for example when its
/// container is missing and cannot be created.
pub async fn run(
    cli: Cli,
    store: ObjectStoreClient,
    processor: Arc<dyn Processor>,
) -> anyhow::Result<()> {
    let provider = store.provider_id();
    let source = BlobStoreSource::from_config(Arc::new(store), &cli.consumer);
    let consumer = Arc::new(BatchConsumer::new(
        source,
        processor,
        cli.consumer.max_messages_per_poll,
    ));

    consumer.start().await.with_context(|| {
        format!(
            "failed to start consumer for container '{}'",
            cli.consumer.container
        )
    })?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        provider,
        container = %cli.consumer.container,
        "consumer running"
    );

    let handle = PollScheduler::new(consumer.clone(), cli.scheduler).spawn(CancellationToken::new());

    shutdown_signal().await;

    let report = GracefulShutdown::new(cli.shutdown)
        .shutdown(consumer.as_ref(), handle)
        .await;

    let scheduler = report.scheduler.unwrap_or_default();
    if report.timed_out {
        tracing::warn!(
            target: TRACING_TARGET_SHUTDOWN,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "shutdown timed out, unfinished objects remain in the store"
        );
    } else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            elapsed_ms = report.elapsed.as_millis() as u64,
            polls = scheduler.polls,
            items = scheduler.items,
            errors = scheduler.errors,
            "consumer shut down"
        );
    }

    Ok(())
}

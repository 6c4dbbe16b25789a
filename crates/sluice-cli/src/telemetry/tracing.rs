//! Tracing initialization and configuration.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the tracing subscriber for structured logging.
///
/// # Configuration
///
/// The log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// ```bash
/// RUST_LOG=debug sluice
/// RUST_LOG=sluice_consumer::batch=trace,sluice_object=debug sluice
/// ```
///
/// # Errors
///
/// Returns an error if the tracing subscriber fails to initialize.
pub(super) fn init_tracing(json: bool) -> anyhow::Result<()> {
    let env_filter = create_env_filter()?;
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
    });
    let json_layer = json.then(|| fmt::layer().json().with_target(true));

    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

/// Creates an environment filter for tracing.
fn create_env_filter() -> anyhow::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))
}

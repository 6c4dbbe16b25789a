//! Process signals that end the consume loop.

use std::io;

use tokio::signal;

use crate::TRACING_TARGET_SHUTDOWN;

/// Resolves once SIGINT or SIGTERM arrives.
///
/// A signal whose handler cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let received = tokio::select! {
        () = watch("SIGINT", signal::ctrl_c()) => "SIGINT",
        () = watch("SIGTERM", terminate()) => "SIGTERM",
    };

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        signal = received,
        "signal received, draining consumer"
    );
}

async fn watch(name: &'static str, signal: impl Future<Output = io::Result<()>>) {
    if let Err(error) = signal.await {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            signal = name,
            error = %error,
            "failed to install signal handler"
        );
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal as unix_signal};

    unix_signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> io::Result<()> {
    std::future::pending().await
}

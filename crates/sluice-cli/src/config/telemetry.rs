//! Log output configuration.

use clap::Args;
use serde::{Deserialize, Serialize};

/// Log output options.
///
/// Filtering is controlled by `RUST_LOG` and defaults to `info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Args)]
pub struct TelemetryConfig {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, env = "LOG_JSON")]
    #[serde(default)]
    pub log_json: bool,
}

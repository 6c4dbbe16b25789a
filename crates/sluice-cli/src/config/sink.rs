//! Delivery sink configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Args;
use serde::{Deserialize, Serialize};
use sluice_consumer::Processor;

use crate::TRACING_TARGET_CONFIG;
use crate::sink::{DirectorySink, LogSink};

/// Where delivered objects go.
///
/// With `--sink-dir` every object is written below that directory under its
/// source name; otherwise objects are only logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Args)]
pub struct SinkConfig {
    /// Directory receiving a copy of every delivered object.
    #[arg(long = "sink-dir", env = "SINK_DIR")]
    #[serde(default)]
    pub sink_dir: Option<PathBuf>,
}

impl SinkConfig {
    /// Validates the sink configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(dir) = &self.sink_dir
            && dir.exists()
            && !dir.is_dir()
        {
            bail!("sink path '{}' exists and is not a directory", dir.display());
        }
        Ok(())
    }

    /// Builds the configured sink, creating its directory if needed.
    pub async fn build(&self) -> anyhow::Result<Arc<dyn Processor>> {
        match &self.sink_dir {
            Some(dir) => {
                let sink = DirectorySink::create(dir).await.with_context(|| {
                    format!("failed to create sink directory '{}'", dir.display())
                })?;
                Ok(Arc::new(sink))
            }
            None => Ok(Arc::new(LogSink::new())),
        }
    }

    /// Logs the sink configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            sink_dir = ?self.sink_dir,
            "Sink configuration"
        );
    }
}

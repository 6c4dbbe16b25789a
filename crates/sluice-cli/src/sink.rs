//! Downstream sinks receiving consumed objects.

use std::path::{Component, Path, PathBuf};

use sluice_consumer::{ProcessError, Processor, WorkItem};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::TRACING_TARGET_SINK;

/// Logs every delivered object and accepts it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    /// Creates a log sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Processor for LogSink {
    async fn process(&self, item: &mut WorkItem) -> Result<(), ProcessError> {
        let batch = item.batch();
        tracing::info!(
            target: TRACING_TARGET_SINK,
            id = %item.id(),
            container = item.container(),
            source_name = item.source_name(),
            size = item.body().len(),
            content_type = item.content_type(),
            batch_index = batch.map(|b| b.index),
            batch_size = batch.map(|b| b.size),
            "received object"
        );
        Ok(())
    }
}

/// Writes every delivered object below a directory, keyed by source name.
///
/// Nested source names create nested directories. An existing file with the
/// same name is overwritten, so redelivered objects are idempotent.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Creates the sink, creating `root` if it does not exist.
    pub async fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory receiving objects.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a source name to a path below the root.
    ///
    /// Names that are absolute or contain `..` are rejected.
    fn target(&self, source_name: &str) -> Option<PathBuf> {
        let relative = Path::new(source_name);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        plain.then(|| self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl Processor for DirectorySink {
    async fn process(&self, item: &mut WorkItem) -> Result<(), ProcessError> {
        let Some(path) = self.target(item.source_name()) else {
            return Err(ProcessError::new(format!(
                "refusing to write '{}' outside the sink directory",
                item.source_name()
            ))
            .permanent());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ProcessError::with_source("failed to create sink directory", e))?;
        }

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| ProcessError::with_source("failed to create sink file", e))?;
        let mut body = item.body().reader();
        tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| ProcessError::with_source("failed to write sink file", e))?;
        file.flush()
            .await
            .map_err(|e| ProcessError::with_source("failed to flush sink file", e))?;

        tracing::debug!(
            target: TRACING_TARGET_SINK,
            source_name = item.source_name(),
            path = %path.display(),
            size = item.body().len(),
            "wrote object"
        );
        Ok(())
    }
}

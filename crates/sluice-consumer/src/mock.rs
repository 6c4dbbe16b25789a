//! Test processors.
//!
//! Only available with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! sluice-consumer = { version = "...", features = ["test-utils"] }
//! ```

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Notify;

use crate::message::{BatchInfo, WorkItem};
use crate::processor::{ProcessError, Processor};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call observed by a test processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Name of the source object.
    pub source_name: String,
    /// Batch position at the time of the call.
    pub batch: Option<BatchInfo>,
    /// Item body.
    pub body: Bytes,
}

impl From<&WorkItem> for Delivery {
    fn from(item: &WorkItem) -> Self {
        Self {
            source_name: item.source_name().to_owned(),
            batch: item.batch(),
            body: item.body().to_bytes(),
        }
    }
}

#[derive(Debug, Default)]
struct Recorder {
    deliveries: Mutex<Vec<Delivery>>,
    notify: Notify,
}

impl Recorder {
    fn record(&self, item: &WorkItem) {
        lock(&self.deliveries).push(Delivery::from(item));
        self.notify.notify_waiters();
    }

    fn deliveries(&self) -> Vec<Delivery> {
        lock(&self.deliveries).clone()
    }

    fn count(&self) -> usize {
        lock(&self.deliveries).len()
    }

    async fn wait_for_calls(&self, calls: usize) {
        loop {
            let notified = self.notify.notified();
            if self.count() >= calls {
                return;
            }
            notified.await;
        }
    }
}

/// Accepts every item and records it.
///
/// An optional delay is applied after recording, so a test can observe an
/// item as in flight with [`wait_for_calls`](Self::wait_for_calls).
#[derive(Debug, Default)]
pub struct RecordingProcessor {
    recorder: Recorder,
    delay: Option<Duration>,
}

impl RecordingProcessor {
    /// Creates a processor that succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every item for `delay` before succeeding.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls observed so far, in call order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.recorder.deliveries()
    }

    /// Source names observed so far, in call order.
    pub fn names(&self) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .map(|delivery| delivery.source_name)
            .collect()
    }

    /// Number of calls so far.
    pub fn count(&self) -> usize {
        self.recorder.count()
    }

    /// Resolves once at least `calls` calls have started.
    pub async fn wait_for_calls(&self, calls: usize) {
        self.recorder.wait_for_calls(calls).await;
    }
}

#[async_trait::async_trait]
impl Processor for RecordingProcessor {
    async fn process(&self, item: &mut WorkItem) -> Result<(), ProcessError> {
        self.recorder.record(item);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

/// Fails selected items and accepts the rest.
#[derive(Debug, Default)]
pub struct FailingProcessor {
    recorder: Recorder,
    fail_on: HashSet<String>,
    permanent: bool,
}

impl FailingProcessor {
    /// Creates a processor failing items whose source name is `name`.
    pub fn on(name: impl Into<String>) -> Self {
        Self::default().and(name)
    }

    /// Also fails items named `name`.
    pub fn and(mut self, name: impl Into<String>) -> Self {
        self.fail_on.insert(name.into());
        self
    }

    /// Reports failures as permanent.
    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    /// Calls observed so far, including failed ones.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.recorder.deliveries()
    }

    /// Source names observed so far, including failed ones.
    pub fn names(&self) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .map(|delivery| delivery.source_name)
            .collect()
    }
}

#[async_trait::async_trait]
impl Processor for FailingProcessor {
    async fn process(&self, item: &mut WorkItem) -> Result<(), ProcessError> {
        self.recorder.record(item);
        if !self.fail_on.contains(item.source_name()) {
            return Ok(());
        }

        let err = ProcessError::new(format!("rejected '{}'", item.source_name()));
        Err(if self.permanent { err.permanent() } else { err })
    }
}

//! Batch polling consumer.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{ConsumerError, Result};
use crate::lifecycle::{
    Lifecycle, PollingGuard, ServiceStatus, ShutdownAware, ShutdownRunningTask, ShutdownState,
    Status,
};
use crate::message::WorkItem;
use crate::processor::Processor;
use crate::source::BatchSource;
use crate::{TRACING_TARGET_BATCH, TRACING_TARGET_POLL, TRACING_TARGET_SHUTDOWN};

/// Polls a [`BatchSource`] and drains each batch through a [`Processor`].
///
/// Items are handed to the processor one at a time, in fetch order. An item
/// is committed (its source object deleted) only after the processor accepted
/// it; the first failure stops the batch and leaves that item and the rest
/// of the batch in the source.
///
/// Shutdown is cooperative: between two items the drain loop checks the run
/// state and the shutdown mode recorded through [`ShutdownAware`].
pub struct BatchConsumer<S> {
    source: S,
    processor: Arc<dyn Processor>,
    max_messages_per_poll: usize,
    status: ServiceStatus,
    shutdown: ShutdownState,
}

impl<S: BatchSource> BatchConsumer<S> {
    /// Creates a stopped consumer.
    ///
    /// A `max_messages_per_poll` of zero fetches everything available.
    pub fn new(source: S, processor: Arc<dyn Processor>, max_messages_per_poll: usize) -> Self {
        Self {
            source,
            processor,
            max_messages_per_poll,
            status: ServiceStatus::new(),
            shutdown: ShutdownState::new(),
        }
    }

    /// The source this consumer polls.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Upper bound on items fetched per poll.
    pub fn max_messages_per_poll(&self) -> usize {
        self.max_messages_per_poll
    }

    /// Shutdown bookkeeping shared with the lifecycle manager.
    pub fn shutdown_state(&self) -> &ShutdownState {
        &self.shutdown
    }

    /// Starts the consumer, preparing its source.
    ///
    /// Starting an already running consumer does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::NotRunning`] while the consumer is starting or
    /// stopping, or when [`stop`](Self::stop) was called before the source
    /// finished starting. Source start failures propagate. In both cases the
    /// consumer is left stopped.
    pub async fn start(&self) -> Result<()> {
        if !self.status.transition(Status::Stopped, Status::Starting) {
            return match self.status.get() {
                Status::Started | Status::Suspended => Ok(()),
                _ => Err(ConsumerError::NotRunning),
            };
        }

        if let Err(err) = self.source.start().await {
            self.status.set(Status::Stopped);
            tracing::error!(
                target: TRACING_TARGET_POLL,
                error = %err,
                "failed to start consumer source"
            );
            return Err(err);
        }

        if !self.status.transition(Status::Starting, Status::Started) {
            tracing::info!(
                target: TRACING_TARGET_POLL,
                "consumer stopped while starting"
            );
            return Err(ConsumerError::NotRunning);
        }

        tracing::info!(
            target: TRACING_TARGET_POLL,
            max_messages_per_poll = self.max_messages_per_poll,
            "consumer started"
        );
        Ok(())
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Whether batch work may continue.
    pub fn is_run_allowed(&self) -> bool {
        self.status.is_run_allowed()
    }

    /// Stops scheduling new polls. An in-flight batch keeps draining.
    pub fn suspend(&self) {
        if self.status.transition(Status::Started, Status::Suspended) {
            tracing::debug!(target: TRACING_TARGET_SHUTDOWN, "consumer suspended");
        }
    }

    /// Resumes a suspended consumer.
    pub fn resume(&self) {
        if self.status.transition(Status::Suspended, Status::Started) {
            tracing::debug!(target: TRACING_TARGET_SHUTDOWN, "consumer resumed");
        }
    }

    /// Stops the consumer. An in-flight batch halts before its next item.
    ///
    /// While a poll cycle is in flight the consumer stays
    /// [`Stopping`](Status::Stopping) until the cycle ends.
    pub fn stop(&self) {
        // Publish Stopping before looking at the poll flag; a cycle ending
        // concurrently then completes the stop itself.
        self.status.set(Status::Stopping);
        if !self.shutdown.is_polling() && self.status.transition(Status::Stopping, Status::Stopped)
        {
            tracing::info!(target: TRACING_TARGET_SHUTDOWN, "consumer stopped");
        } else {
            tracing::info!(target: TRACING_TARGET_SHUTDOWN, "consumer stopping");
        }
    }

    /// Runs one poll cycle and returns the number of items handed over.
    ///
    /// # Errors
    ///
    /// Fetch failures propagate without processing anything. Processing and
    /// commit failures propagate from [`process_batch`](Self::process_batch).
    pub async fn poll(&self) -> Result<usize> {
        let _cycle = self.begin_cycle();
        self.shutdown.reset();

        let queue = match self.source.fetch(self.max_messages_per_poll).await {
            Ok(queue) => queue,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_POLL,
                    error = %err,
                    "failed to fetch batch"
                );
                return Err(err);
            }
        };

        if queue.is_empty() {
            tracing::trace!(target: TRACING_TARGET_POLL, "nothing to consume");
            return Ok(0);
        }

        tracing::debug!(
            target: TRACING_TARGET_POLL,
            batch_size = queue.len(),
            "fetched batch"
        );
        self.process_batch(queue).await
    }

    /// Drains `queue` through the processor and returns the batch size.
    ///
    /// The size is returned even when the drain stopped early because of a
    /// shutdown request.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Processing`] for the first rejected item and
    /// [`ConsumerError::Store`] when committing an accepted item fails. Either
    /// stops the batch.
    pub async fn process_batch(&self, queue: VecDeque<WorkItem>) -> Result<usize> {
        let total = queue.len();
        let result = self.drain(queue, total).await;
        self.shutdown.set_pending(0);
        result.map(|()| total)
    }

    async fn drain(&self, mut queue: VecDeque<WorkItem>, total: usize) -> Result<()> {
        for index in 0..total {
            if !self.is_batch_allowed() {
                tracing::debug!(
                    target: TRACING_TARGET_BATCH,
                    batch_index = index,
                    batch_size = total,
                    "batch interrupted by shutdown"
                );
                break;
            }

            let Some(mut item) = queue.pop_front() else {
                break;
            };

            item.stamp_batch(index, total);
            self.shutdown.set_pending(total - index - 1);

            tracing::trace!(
                target: TRACING_TARGET_BATCH,
                source_name = item.source_name(),
                batch_index = index,
                batch_size = total,
                "processing item"
            );

            if let Err(source) = self.processor.process(&mut item).await {
                tracing::warn!(
                    target: TRACING_TARGET_BATCH,
                    source_name = item.source_name(),
                    batch_index = index,
                    batch_size = total,
                    error = %source,
                    "processing failed, leaving object in store"
                );
                return Err(ConsumerError::Processing {
                    source_name: item.source_name().to_owned(),
                    source,
                });
            }

            self.source.commit(&item).await?;
        }

        Ok(())
    }

    /// Whether the drain loop may start its next item.
    pub fn is_batch_allowed(&self) -> bool {
        self.is_run_allowed() && self.shutdown.allows_next_item()
    }

    fn begin_cycle(&self) -> PollCycle<'_> {
        PollCycle {
            polling: Some(self.shutdown.begin_poll()),
            status: &self.status,
        }
    }
}

/// Marks a poll cycle in flight and completes a pending stop when it ends,
/// including when the cycle is cancelled.
struct PollCycle<'a> {
    polling: Option<PollingGuard<'a>>,
    status: &'a ServiceStatus,
}

impl Drop for PollCycle<'_> {
    fn drop(&mut self) {
        // The poll flag must be clear before the status is checked, see `stop()`.
        drop(self.polling.take());
        if self.status.transition(Status::Stopping, Status::Stopped) {
            tracing::info!(target: TRACING_TARGET_SHUTDOWN, "consumer stopped");
        }
    }
}

impl<S: BatchSource> ShutdownAware for BatchConsumer<S> {
    fn defer_shutdown(&self, mode: ShutdownRunningTask) -> bool {
        self.shutdown.set_mode(mode);
        tracing::debug!(target: TRACING_TARGET_SHUTDOWN, ?mode, "shutdown requested");
        false
    }

    fn pending_exchanges_size(&self) -> usize {
        let pending = self.shutdown.pending_exchanges_size();
        tracing::trace!(target: TRACING_TARGET_SHUTDOWN, pending, "pending items");
        pending
    }

    fn prepare_shutdown(&self) {
        self.source.prepare_shutdown();
    }
}

impl<S: BatchSource> Lifecycle for BatchConsumer<S> {
    fn status(&self) -> Status {
        BatchConsumer::status(self)
    }

    fn suspend(&self) {
        BatchConsumer::suspend(self);
    }

    fn resume(&self) {
        BatchConsumer::resume(self);
    }

    fn stop(&self) {
        BatchConsumer::stop(self);
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for BatchConsumer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchConsumer")
            .field("source", &self.source)
            .field("max_messages_per_poll", &self.max_messages_per_poll)
            .field("status", &self.status)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use sluice_object::mock::FaultyStore;
    use sluice_object::{BlobStore, ObjectStoreClient, StorageKind, StorageMetadata};

    use super::*;
    use crate::message::BatchInfo;
    use crate::mock::{FailingProcessor, RecordingProcessor};
    use crate::source::BlobStoreSource;

    async fn seeded(keys: &[&str]) -> ObjectStoreClient {
        let client = ObjectStoreClient::memory();
        client.create_container("inbox", None).await.unwrap();
        for key in keys {
            client
                .put("inbox", key, Bytes::from(key.to_string()), None)
                .await
                .unwrap();
        }
        client
    }

    async fn remaining(store: &dyn BlobStore) -> Vec<String> {
        store
            .list("inbox", &sluice_object::ListOptions::new().recursive())
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    async fn started<S: BatchSource>(
        source: S,
        processor: Arc<dyn Processor>,
        max: usize,
    ) -> BatchConsumer<S> {
        let consumer = BatchConsumer::new(source, processor, max);
        consumer.start().await.unwrap();
        consumer
    }

    #[tokio::test]
    async fn delivers_each_blob_once_in_order_and_deletes_it() {
        let client = seeded(&["a", "b", "c"]).await;
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = started(source, processor.clone(), 10).await;

        assert_eq!(consumer.poll().await.unwrap(), 3);
        assert_eq!(processor.names(), ["a", "b", "c"]);
        assert!(remaining(&client).await.is_empty());

        let batches: Vec<_> = processor
            .deliveries()
            .into_iter()
            .map(|delivery| delivery.batch)
            .collect();
        assert_eq!(
            batches,
            [
                Some(BatchInfo { index: 0, size: 3 }),
                Some(BatchInfo { index: 1, size: 3 }),
                Some(BatchInfo { index: 2, size: 3 }),
            ]
        );
        let last: Vec<_> = batches
            .iter()
            .map(|batch| batch.is_some_and(|b| b.is_last_in_batch()))
            .collect();
        assert_eq!(last, [false, false, true]);
        assert_eq!(processor.deliveries()[1].body, Bytes::from("b"));
    }

    #[tokio::test]
    async fn failure_stops_batch_and_keeps_remaining_objects() {
        let client = seeded(&["a", "b", "c"]).await;
        let processor = Arc::new(FailingProcessor::on("b"));
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = started(source, processor.clone(), 10).await;

        let err = consumer.poll().await.unwrap_err();
        assert!(
            matches!(&err, ConsumerError::Processing { source_name, .. } if source_name == "b")
        );
        assert_eq!(processor.names(), ["a", "b"]);
        assert_eq!(remaining(&client).await, ["b", "c"]);
        assert_eq!(consumer.pending_exchanges_size(), 0);
    }

    #[tokio::test]
    async fn empty_listing_never_invokes_processor() {
        let client = seeded(&[]).await;
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(Arc::new(client), "inbox");
        let consumer = started(source, processor.clone(), 10).await;

        assert_eq!(consumer.poll().await.unwrap(), 0);
        assert_eq!(processor.count(), 0);
    }

    #[tokio::test]
    async fn bounded_polls_drain_in_successive_cycles() {
        let client = seeded(&["a", "b", "c"]).await;
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = started(source, processor.clone(), 2).await;

        assert_eq!(consumer.poll().await.unwrap(), 2);
        assert_eq!(consumer.poll().await.unwrap(), 1);
        assert_eq!(consumer.poll().await.unwrap(), 0);
        assert_eq!(processor.names(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn folders_and_other_prefixes_are_never_delivered() {
        let client = seeded(&["orders/1", "orders/2", "returns/3"]).await;
        let store = FaultyStore::new(client.clone());
        store.inject_entry(StorageMetadata::with_kind("orders/sub", StorageKind::Folder));
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(Arc::new(store), "inbox").with_directory("orders");
        let consumer = started(source, processor.clone(), 10).await;

        assert_eq!(consumer.poll().await.unwrap(), 2);
        assert_eq!(processor.names(), ["orders/1", "orders/2"]);
        assert_eq!(remaining(&client).await, ["returns/3"]);
    }

    #[tokio::test]
    async fn list_failure_processes_nothing() {
        let store = Arc::new(FaultyStore::new(seeded(&["a"]).await));
        store.fail_list(true);
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(store.clone(), "inbox");
        let consumer = started(source, processor.clone(), 10).await;

        assert!(matches!(
            consumer.poll().await.unwrap_err(),
            ConsumerError::Store(_)
        ));
        assert_eq!(processor.count(), 0);
        assert!(!consumer.shutdown_state().is_polling());
    }

    #[tokio::test]
    async fn delete_failure_stops_batch() {
        let store = Arc::new(FaultyStore::new(seeded(&["a", "b", "c"]).await));
        store.fail_remove("b");
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(store.clone(), "inbox");
        let consumer = started(source, processor.clone(), 10).await;

        assert!(matches!(
            consumer.poll().await.unwrap_err(),
            ConsumerError::Store(_)
        ));
        assert_eq!(processor.names(), ["a", "b"]);
        assert_eq!(store.removed(), ["a"]);
    }

    #[tokio::test]
    async fn stopped_consumer_drains_nothing() {
        let client = seeded(&["a", "b"]).await;
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = BatchConsumer::new(source, processor.clone(), 10);

        assert_eq!(consumer.poll().await.unwrap(), 2);
        assert_eq!(processor.count(), 0);
        assert_eq!(remaining(&client).await, ["a", "b"]);
    }

    #[tokio::test]
    async fn batch_allowed_follows_shutdown_mode() {
        let source = BlobStoreSource::new(Arc::new(seeded(&[]).await), "inbox");
        let consumer = started(source, Arc::new(RecordingProcessor::new()), 10).await;

        assert!(consumer.is_batch_allowed());

        assert!(!consumer.defer_shutdown(ShutdownRunningTask::CompleteAllTasks));
        assert!(consumer.is_batch_allowed());

        consumer.defer_shutdown(ShutdownRunningTask::CompleteCurrentTaskOnly);
        assert!(!consumer.is_batch_allowed());

        consumer.shutdown_state().reset();
        consumer.suspend();
        assert_eq!(consumer.status(), Status::Suspended);
        assert!(consumer.is_batch_allowed());

        consumer.stop();
        assert!(!consumer.is_batch_allowed());
    }

    #[tokio::test]
    async fn idle_consumer_reports_no_pending_work() {
        let source = BlobStoreSource::new(Arc::new(seeded(&[]).await), "inbox");
        let consumer = started(source, Arc::new(RecordingProcessor::new()), 10).await;

        consumer.defer_shutdown(ShutdownRunningTask::CompleteCurrentTaskOnly);
        assert_eq!(consumer.pending_exchanges_size(), 0);

        consumer.defer_shutdown(ShutdownRunningTask::CompleteAllTasks);
        assert_eq!(consumer.pending_exchanges_size(), 0);

        let _polling = consumer.shutdown_state().begin_poll();
        assert!(consumer.pending_exchanges_size() >= 1);
    }

    #[tokio::test]
    async fn complete_all_tasks_reports_remaining_items() {
        let client = seeded(&["a", "b", "c"]).await;
        let processor = Arc::new(RecordingProcessor::new().with_delay(Duration::from_millis(50)));
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = Arc::new(started(source, processor.clone(), 10).await);

        let polling = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.poll().await }
        });

        processor.wait_for_calls(1).await;
        consumer.defer_shutdown(ShutdownRunningTask::CompleteAllTasks);
        assert_eq!(consumer.pending_exchanges_size(), 2);

        assert_eq!(polling.await.unwrap().unwrap(), 3);
        assert_eq!(consumer.pending_exchanges_size(), 0);
        assert!(remaining(&client).await.is_empty());
    }

    #[tokio::test]
    async fn complete_current_task_only_leaves_rest_of_batch() {
        let client = seeded(&["a", "b", "c"]).await;
        let processor = Arc::new(RecordingProcessor::new().with_delay(Duration::from_millis(50)));
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = Arc::new(started(source, processor.clone(), 10).await);

        let polling = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.poll().await }
        });

        processor.wait_for_calls(1).await;
        consumer.defer_shutdown(ShutdownRunningTask::CompleteCurrentTaskOnly);
        assert_eq!(consumer.pending_exchanges_size(), 1);

        assert_eq!(polling.await.unwrap().unwrap(), 3);
        assert_eq!(processor.names(), ["a"]);
        assert_eq!(remaining(&client).await, ["b", "c"]);
    }

    #[tokio::test]
    async fn shutdown_request_does_not_leak_into_next_poll() {
        let client = seeded(&["a", "b", "c"]).await;
        let processor = Arc::new(RecordingProcessor::new());
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = started(source, processor.clone(), 10).await;

        consumer.defer_shutdown(ShutdownRunningTask::CompleteCurrentTaskOnly);
        assert!(!consumer.is_batch_allowed());

        assert_eq!(consumer.poll().await.unwrap(), 3);
        assert_eq!(processor.names(), ["a", "b", "c"]);
        assert!(remaining(&client).await.is_empty());
        assert_eq!(consumer.shutdown_state().mode(), None);
    }

    #[tokio::test]
    async fn stop_published_before_cycle_ends_settles_stopped() {
        let source = BlobStoreSource::new(Arc::new(seeded(&[]).await), "inbox");
        let consumer = started(source, Arc::new(RecordingProcessor::new()), 10).await;

        let cycle = consumer.begin_cycle();
        consumer.stop();
        assert_eq!(consumer.status(), Status::Stopping);

        drop(cycle);
        assert!(!consumer.shutdown_state().is_polling());
        assert_eq!(consumer.status(), Status::Stopped);

        consumer.start().await.unwrap();
        assert_eq!(consumer.status(), Status::Started);
    }

    #[tokio::test]
    async fn stop_after_cycle_ended_settles_stopped() {
        let source = BlobStoreSource::new(Arc::new(seeded(&[]).await), "inbox");
        let consumer = started(source, Arc::new(RecordingProcessor::new()), 10).await;

        drop(consumer.begin_cycle());
        assert_eq!(consumer.status(), Status::Started);

        consumer.stop();
        assert_eq!(consumer.status(), Status::Stopped);
    }

    struct GatedSource {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl BatchSource for GatedSource {
        async fn start(&self) -> Result<()> {
            self.gate.notified().await;
            Ok(())
        }

        async fn fetch(&self, _max: usize) -> Result<VecDeque<WorkItem>> {
            Ok(VecDeque::new())
        }

        async fn commit(&self, _item: &WorkItem) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stop_while_starting_wins_over_start() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let source = GatedSource { gate: gate.clone() };
        let consumer = Arc::new(BatchConsumer::new(
            source,
            Arc::new(RecordingProcessor::new()),
            10,
        ));

        let starting = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.start().await }
        });
        while consumer.status() != Status::Starting {
            tokio::task::yield_now().await;
        }

        consumer.stop();
        assert_eq!(consumer.status(), Status::Stopped);

        gate.notify_one();
        assert!(matches!(
            starting.await.unwrap().unwrap_err(),
            ConsumerError::NotRunning
        ));
        assert_eq!(consumer.status(), Status::Stopped);
    }

    struct BrokenSource;

    #[async_trait::async_trait]
    impl BatchSource for BrokenSource {
        async fn start(&self) -> Result<()> {
            Err(sluice_object::Error::connection("unreachable", "test", true).into())
        }

        async fn fetch(&self, _max: usize) -> Result<VecDeque<WorkItem>> {
            Ok(VecDeque::new())
        }

        async fn commit(&self, _item: &WorkItem) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn start_failure_leaves_consumer_stopped() {
        let consumer = BatchConsumer::new(BrokenSource, Arc::new(RecordingProcessor::new()), 10);

        assert!(matches!(
            consumer.start().await.unwrap_err(),
            ConsumerError::Store(_)
        ));
        assert_eq!(consumer.status(), Status::Stopped);
    }

    #[tokio::test]
    async fn start_is_idempotent_once_running() {
        let source = BlobStoreSource::new(Arc::new(seeded(&[]).await), "inbox");
        let consumer = started(source, Arc::new(RecordingProcessor::new()), 10).await;

        consumer.start().await.unwrap();
        assert_eq!(consumer.status(), Status::Started);
    }

    #[tokio::test]
    async fn stop_during_poll_completes_when_cycle_ends() {
        let client = seeded(&["a", "b"]).await;
        let processor = Arc::new(RecordingProcessor::new().with_delay(Duration::from_millis(50)));
        let source = BlobStoreSource::new(Arc::new(client.clone()), "inbox");
        let consumer = Arc::new(started(source, processor.clone(), 10).await);

        let polling = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.poll().await }
        });

        processor.wait_for_calls(1).await;
        consumer.stop();
        assert_eq!(consumer.status(), Status::Stopping);

        assert_eq!(polling.await.unwrap().unwrap(), 2);
        assert_eq!(consumer.status(), Status::Stopped);
        assert_eq!(processor.names(), ["a"]);
        assert_eq!(remaining(&client).await, ["b"]);
    }
}

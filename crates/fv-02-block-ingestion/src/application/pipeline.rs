//! # Ingestion Pipeline
//!
//! Wires queue, worker pool, writer, snapshotter and subscriber together
//! and drives them in one of two modes.
//!
//! ## Bounded
//!
//! ```text
//! load backlog → tick until the queue is idle → wait for the writer
//!             → advance checkpoint → retry missing blocks (retry_passes
//!             times, advancing after each) → stop → report
//! ```
//!
//! ## Tail
//!
//! ```text
//! subscribe → first header H → load [start, H-1] → every tick:
//!   reconnect if needed, reload backlog to head, advance checkpoint,
//!   reap + scale, respawn a dead subscriber
//! ```

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use fv_01_event_store::{EventStore, KeyValueStore};
use shared_types::{BlockNumber, Checkpoint};

use crate::algorithms::missing_blocks;
use crate::application::node_directory::NodeDirectory;
use crate::application::pool::WorkerPool;
use crate::application::snapshotter::PowerSnapshotter;
use crate::application::subscriber::{spawn_subscriber, HeadSender};
use crate::application::worker::Worker;
use crate::application::writer::{spawn_writer, WriterHandle};
use crate::config::IngestionConfig;
use crate::domain::{
    BlockQueue, IngestionError, IngestionReport, ScanRange, SnapshotReport, WriterStats,
};
use crate::ports::BlockSource;

/// Components of one run.
struct Run<S: KeyValueStore + 'static, B: BlockSource + 'static> {
    queue: Arc<BlockQueue>,
    writer: WriterHandle,
    writer_task: JoinHandle<WriterStats>,
    pool: WorkerPool<S, B>,
    snapshot_task: Option<JoinHandle<Result<SnapshotReport, IngestionError>>>,
}

pub struct IngestionPipeline<S: KeyValueStore + 'static, B: BlockSource + 'static> {
    config: IngestionConfig,
    source: Arc<B>,
    store: Arc<EventStore<S>>,
}

impl<S: KeyValueStore + 'static, B: BlockSource + 'static> IngestionPipeline<S, B> {
    pub fn new(mut config: IngestionConfig, source: Arc<B>, store: Arc<EventStore<S>>) -> Self {
        // A pool that may shrink to zero never drains.
        config.min_workers = config.min_workers.max(1);
        config.max_workers = config.max_workers.max(config.min_workers);
        Self {
            config,
            source,
            store,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<EventStore<S>> {
        &self.store
    }

    fn start_run(&self, first_block: BlockNumber) -> Run<S, B> {
        let queue = Arc::new(BlockQueue::new());
        let (writer, writer_task) = spawn_writer(Arc::clone(&self.store));
        let directory = Arc::new(NodeDirectory::new(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            writer.clone(),
        ));
        let pool = WorkerPool::new(
            Worker {
                source: Arc::clone(&self.source),
                store: Arc::clone(&self.store),
                queue: Arc::clone(&queue),
                writer: writer.clone(),
                directory,
            },
            self.config.min_workers,
            self.config.max_workers,
        );

        let snapshot_task = self.config.take_snapshots.then(|| {
            let snapshotter = PowerSnapshotter::new(
                Arc::clone(&self.source),
                Arc::clone(&self.store),
                writer.clone(),
                self.config.snapshot_batch_size,
                self.config.snapshot_progress_every,
            );
            tokio::spawn(async move { snapshotter.run(first_block).await })
        });

        Run {
            queue,
            writer,
            writer_task,
            pool,
            snapshot_task,
        }
    }

    /// Queue every unprocessed block of `[start, end]`. Returns how many.
    pub fn load_backlog(
        &self,
        queue: &BlockQueue,
        start: BlockNumber,
        end: BlockNumber,
    ) -> Result<usize, IngestionError> {
        let processed = self.store.processed_blocks()?;
        let missing = missing_blocks(start, end, &processed);
        for block in &missing {
            queue.push(*block);
        }
        Ok(missing.len())
    }

    fn initial_workers(&self, backlog: usize) -> usize {
        backlog.clamp(self.config.min_workers, self.config.max_workers)
    }

    /// Tick until every queued item has been attempted.
    async fn drain(&self, run: &mut Run<S, B>) {
        let interval = self.config.scale_interval();
        while run.queue.unfinished() > 0 {
            let before = run.queue.depth();
            tokio::select! {
                _ = run.queue.wait_idle() => {}
                _ = tokio::time::sleep(interval) => {}
            }
            run.pool.reap();
            info!(
                "[fv-02] Processed {} blocks, {} remaining, {} workers alive, {} pending writes",
                before.saturating_sub(run.queue.depth()),
                run.queue.depth(),
                run.pool.live(),
                run.writer.pending()
            );
            run.pool.scale();
        }
    }

    async fn finish_snapshot(run: &mut Run<S, B>, wait: bool) -> Option<SnapshotReport> {
        let task = run.snapshot_task.take()?;
        if !wait && !task.is_finished() {
            task.abort();
            warn!("[fv-02] Power snapshot interrupted");
            return None;
        }
        match task.await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                warn!("[fv-02] Power snapshot failed: {}", e);
                None
            }
            Err(e) => {
                warn!("[fv-02] Power snapshot task failed: {}", e);
                None
            }
        }
    }

    /// Close the writer after everything already submitted and collect its counters.
    async fn stop_writer(run: Run<S, B>) -> Result<WriterStats, IngestionError> {
        run.writer.close();
        run.writer_task
            .await
            .map_err(|e| IngestionError::TaskFailed(e.to_string()))
    }

    fn advance_checkpoint(&self, start: BlockNumber) -> Option<Checkpoint> {
        match self.store.advance_checkpoint(start) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!("[fv-02] Failed to advance checkpoint: {}", e);
                None
            }
        }
    }

    fn missing_count(&self, start: BlockNumber, end: BlockNumber) -> Result<usize, IngestionError> {
        let processed = self.store.processed_blocks()?;
        Ok(missing_blocks(start, end, &processed).len())
    }

    async fn ensure_connected(&self) {
        if !self.source.is_connected().await {
            warn!("[fv-02] Source disconnected, reconnecting");
            if let Err(e) = self.source.reconnect().await {
                warn!("[fv-02] Reconnect failed: {}", e);
            }
        }
    }

    fn keep_subscribed(&self, subscriber: &mut JoinHandle<()>, queue: &Arc<BlockQueue>, head: &HeadSender) {
        if subscriber.is_finished() {
            warn!("[fv-02] Subscription task died, respawning it");
            *subscriber = spawn_subscriber(Arc::clone(&self.source), Arc::clone(queue), Arc::clone(head));
        }
    }

    // =========================================================================
    // BOUNDED MODE
    // =========================================================================

    /// Ingest `[start, end]` and stop. `missing` in the report counts blocks
    /// still unprocessed after all retry passes.
    pub async fn run_bounded(
        &self,
        start: BlockNumber,
        end: BlockNumber,
    ) -> Result<IngestionReport, IngestionError> {
        if end < start {
            return Err(IngestionError::InvalidRange { start, end });
        }

        let mut run = self.start_run(start);
        let backlog = self.load_backlog(&run.queue, start, end)?;
        let workers = self.initial_workers(backlog);
        info!(
            "[fv-02] Starting {} workers to process {} blocks in [{}, {}]",
            workers, backlog, start, end
        );
        run.pool.spawn(workers);

        self.drain(&mut run).await;
        run.writer.wait_drained().await;
        self.advance_checkpoint(start);

        for pass in 1..=self.config.retry_passes {
            let missing = self.load_backlog(&run.queue, start, end)?;
            if missing == 0 {
                break;
            }
            info!(
                "[fv-02] Retry pass {}: {} blocks to retry, {} workers alive",
                pass,
                missing,
                run.pool.live()
            );
            self.drain(&mut run).await;
            run.writer.wait_drained().await;
            self.advance_checkpoint(start);
        }

        let snapshot = Self::finish_snapshot(&mut run, true).await;
        run.pool.shutdown().await;
        let writer = Self::stop_writer(run).await?;

        let missing = self.missing_count(start, end)?;
        let checkpoint = self.advance_checkpoint(start);
        if missing > 0 {
            warn!("[fv-02] {} blocks of [{}, {}] remain unprocessed", missing, start, end);
        } else {
            info!("[fv-02] All blocks of [{}, {}] processed", start, end);
        }

        Ok(IngestionReport {
            range: ScanRange::bounded(start, end),
            missing,
            checkpoint,
            writer,
            snapshot,
        })
    }

    // =========================================================================
    // TAIL MODE
    // =========================================================================

    /// Ingest from `start` and follow the chain head until `shutdown`
    /// turns true (or its sender is dropped).
    pub async fn run_tail(
        &self,
        start: BlockNumber,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<IngestionReport, IngestionError> {
        let interval = self.config.scale_interval();
        let mut run = self.start_run(start);

        let (head_tx, mut head_rx) = watch::channel(None);
        let head: HeadSender = Arc::new(head_tx);
        let mut subscriber =
            spawn_subscriber(Arc::clone(&self.source), Arc::clone(&run.queue), Arc::clone(&head));

        // The first header fixes the end of the historic range.
        let first_head = loop {
            if *shutdown.borrow() {
                break None;
            }
            let current = *head_rx.borrow_and_update();
            if let Some(number) = current {
                break Some(number);
            }
            tokio::select! {
                _ = head_rx.changed() => {}
                _ = tokio::time::sleep(interval) => {
                    self.ensure_connected().await;
                    self.keep_subscribed(&mut subscriber, &run.queue, &head);
                }
                _ = shutdown.changed() => break None,
            }
        };

        if let Some(first_head) = first_head {
            let backlog = self.load_backlog(&run.queue, start, first_head.saturating_sub(1))?;
            let workers = self.initial_workers(run.queue.depth());
            info!(
                "[fv-02] Starting {} workers to process {} historic blocks from {}, head at {}",
                workers, backlog, start, first_head
            );
            run.pool.spawn(workers);

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.changed() => break,
                }
                if *shutdown.borrow() {
                    break;
                }

                self.ensure_connected().await;
                match self.source.latest_block_number().await {
                    Ok(current) => {
                        if let Err(e) = self.load_backlog(&run.queue, start, current) {
                            warn!("[fv-02] Failed to reload backlog: {}", e);
                        }
                    }
                    Err(e) => warn!("[fv-02] Failed to read chain head: {}", e),
                }

                let checkpoint = self.advance_checkpoint(start);
                run.pool.reap();
                info!(
                    "[fv-02] {} blocks remaining, {} workers alive, {} pending writes, checkpoint {:?}",
                    run.queue.depth(),
                    run.pool.live(),
                    run.writer.pending(),
                    checkpoint.map(|cp| cp.block)
                );
                run.pool.scale();
                self.keep_subscribed(&mut subscriber, &run.queue, &head);
            }
        }

        info!("[fv-02] Shutdown requested, stopping ingestion");
        subscriber.abort();
        let snapshot = Self::finish_snapshot(&mut run, false).await;
        run.pool.abort().await;
        let writer = Self::stop_writer(run).await?;

        let last_head = *head_rx.borrow();
        let missing = match last_head {
            Some(head) => self.missing_count(start, head)?,
            None => 0,
        };
        let checkpoint = self.advance_checkpoint(start);

        Ok(IngestionReport {
            range: ScanRange::tail(start),
            missing,
            checkpoint,
            writer,
            snapshot,
        })
    }
}

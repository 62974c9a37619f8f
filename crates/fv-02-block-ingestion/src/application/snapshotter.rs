//! # Power Snapshotter
//!
//! Captures every node's power state and target at the first block of the
//! scan window. The violation engine uses these rows as the initial
//! condition of a minting period.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use fv_01_event_store::{EventStore, KeyValueStore};
use shared_types::{BlockNumber, PowerStateSnapshot, Timestamp};

use crate::application::writer::{WriteJob, WriterHandle};
use crate::domain::{IngestionError, SnapshotReport};
use crate::ports::BlockSource;

pub struct PowerSnapshotter<S: KeyValueStore, B: BlockSource> {
    source: Arc<B>,
    store: Arc<EventStore<S>>,
    writer: WriterHandle,
    batch_size: usize,
    progress_every: u32,
}

impl<S: KeyValueStore, B: BlockSource> PowerSnapshotter<S, B> {
    pub fn new(
        source: Arc<B>,
        store: Arc<EventStore<S>>,
        writer: WriterHandle,
        batch_size: usize,
        progress_every: u32,
    ) -> Self {
        Self {
            source,
            store,
            writer,
            batch_size: batch_size.max(1),
            progress_every: progress_every.max(1),
        }
    }

    /// Snapshot all nodes at `block` that do not have a row there yet.
    pub async fn run(&self, block: BlockNumber) -> Result<SnapshotReport, IngestionError> {
        let raw = self.source.get_block_by_number(block).await?;
        let timestamp = self.source.get_timestamp(&raw).await?;
        let node_count = self.source.get_current_node_count(&raw.hash).await?;
        let existing = self.store.snapshot_nodes_at(block)?;

        let mut report = SnapshotReport {
            block,
            node_count,
            ..Default::default()
        };
        info!(
            "[fv-02] Fetching power states for {} nodes at block {}",
            (node_count as usize).saturating_sub(existing.len()),
            block
        );

        let mut down_times: HashMap<BlockNumber, Timestamp> = HashMap::new();
        let mut batch = Vec::with_capacity(self.batch_size);
        for node_id in 1..=node_count {
            if node_id % self.progress_every == 0 {
                info!("[fv-02] Processed {} initial power states", node_id);
            }
            if existing.contains(&node_id) {
                report.skipped += 1;
                continue;
            }

            let power = match self.source.get_node_power(node_id, &raw.hash).await {
                Ok(power) => power,
                Err(e) => {
                    warn!("[fv-02] Power query for node {} failed: {}", node_id, e);
                    report.failed += 1;
                    continue;
                }
            };

            let down_time = match (power.state.is_down(), power.down_block) {
                (true, Some(down_block)) => self.down_time(down_block, &mut down_times).await,
                _ => None,
            };

            batch.push(PowerStateSnapshot {
                node_id,
                state: power.state,
                down_block: if power.state.is_down() {
                    power.down_block
                } else {
                    None
                },
                down_time,
                target: power.target,
                block,
                timestamp,
            });

            if batch.len() >= self.batch_size {
                report.submitted += batch.len();
                self.writer
                    .submit(WriteJob::PowerSnapshot(std::mem::take(&mut batch)))?;
            }
        }

        if !batch.is_empty() {
            report.submitted += batch.len();
            self.writer.submit(WriteJob::PowerSnapshot(batch))?;
        }

        info!(
            "[fv-02] Power snapshot at block {} done: {} submitted, {} skipped, {} failed",
            block, report.submitted, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Timestamp of the block a node went to sleep at, cached per block.
    async fn down_time(
        &self,
        down_block: BlockNumber,
        cache: &mut HashMap<BlockNumber, Timestamp>,
    ) -> Option<Timestamp> {
        if let Some(ts) = cache.get(&down_block) {
            return Some(*ts);
        }
        let fetched = match self.source.get_block_by_number(down_block).await {
            Ok(raw) => self.source.get_timestamp(&raw).await,
            Err(e) => Err(e),
        };
        match fetched {
            Ok(ts) => {
                cache.insert(down_block, ts);
                Some(ts)
            }
            Err(e) => {
                warn!("[fv-02] No timestamp for down block {}: {}", down_block, e);
                None
            }
        }
    }
}

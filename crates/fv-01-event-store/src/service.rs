//! # Event Store Service
//!
//! Repository over a `KeyValueStore` holding decoded events, power
//! snapshots, processed-block markers, node identities and the ingestion
//! checkpoint.
//!
//! ## Guarantees
//!
//! - A block's events and its processed marker are one atomic batch.
//! - Committing an already processed block writes nothing.
//! - Snapshots and identities are insert-if-absent and never updated.
//! - Readers share a read lock and only ever see committed batches.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use shared_types::{
    BlockNumber, ChainEvent, Checkpoint, NodeId, NodeIdentity, NodeUptimeReported, Power,
    PowerStateChanged, PowerStateSnapshot, PowerTargetChanged, Timestamp,
};

use crate::domain::keys;
use crate::domain::{BlockWrite, CommitOutcome, EventStoreError, ProcessedMarker};
use crate::ports::outbound::{BatchOperation, KeyValueStore};

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EventStoreError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EventStoreError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Durable, idempotent event store.
pub struct EventStore<S: KeyValueStore> {
    kv: RwLock<S>,
}

impl<S: KeyValueStore> EventStore<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv: RwLock::new(kv),
        }
    }

    // =========================================================================
    // BLOCK COMMITS
    // =========================================================================

    /// Commit a block's events and its processed marker atomically.
    pub fn commit_block(&self, write: &BlockWrite) -> Result<CommitOutcome, EventStoreError> {
        let marker = keys::processed_key(write.block.number);

        let mut kv = self.kv.write();
        if kv.exists(&marker)? {
            return Ok(CommitOutcome::AlreadyProcessed);
        }

        let mut ops = Vec::with_capacity(write.events.len() + 1);
        for event in &write.events {
            let key = keys::event_key(
                keys::prefix_for(event),
                event.node_id(),
                event.block(),
                event.event_index(),
            );
            let value = match event {
                ChainEvent::Uptime(e) => encode(e)?,
                ChainEvent::Target(e) => encode(e)?,
                ChainEvent::State(e) => encode(e)?,
            };
            ops.push(BatchOperation::put(key, value));
        }
        ops.push(BatchOperation::put(
            marker,
            encode(&ProcessedMarker {
                timestamp: write.block.timestamp,
            })?,
        ));

        kv.atomic_batch_write(ops)?;
        Ok(CommitOutcome::Committed {
            events: write.events.len(),
        })
    }

    pub fn is_processed(&self, block: BlockNumber) -> Result<bool, EventStoreError> {
        Ok(self.kv.read().exists(&keys::processed_key(block))?)
    }

    /// Timestamp recorded with a processed marker.
    pub fn processed_timestamp(
        &self,
        block: BlockNumber,
    ) -> Result<Option<Timestamp>, EventStoreError> {
        let raw = self.kv.read().get(&keys::processed_key(block))?;
        raw.map(|bytes| decode::<ProcessedMarker>(&bytes).map(|m| m.timestamp))
            .transpose()
    }

    /// Every processed block number.
    pub fn processed_blocks(&self) -> Result<BTreeSet<BlockNumber>, EventStoreError> {
        let rows = self.kv.read().prefix_scan(keys::PROCESSED_PREFIX)?;
        rows.into_iter()
            .map(|(key, _)| {
                keys::block_from_processed_key(&key).ok_or(EventStoreError::MalformedKey { key })
            })
            .collect()
    }

    // =========================================================================
    // EVENT QUERIES
    // =========================================================================

    fn node_rows<T: DeserializeOwned>(
        &self,
        prefix: &[u8],
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
        timestamp_of: impl Fn(&T) -> Timestamp,
    ) -> Result<Vec<T>, EventStoreError> {
        let rows = self
            .kv
            .read()
            .prefix_scan(&keys::node_prefix(prefix, node_id))?;

        let mut out = Vec::new();
        for (_, value) in rows {
            let row: T = decode(&value)?;
            let ts = timestamp_of(&row);
            if ts >= from && ts <= to {
                out.push(row);
            }
        }
        Ok(out)
    }

    /// Uptime reports of a node with `from <= timestamp <= to`.
    pub fn uptime_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<NodeUptimeReported>, EventStoreError> {
        self.node_rows(keys::UPTIME_PREFIX, node_id, from, to, |e: &NodeUptimeReported| {
            e.timestamp
        })
    }

    /// Power target changes of a node with `from <= timestamp <= to`.
    pub fn target_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PowerTargetChanged>, EventStoreError> {
        self.node_rows(keys::TARGET_PREFIX, node_id, from, to, |e: &PowerTargetChanged| {
            e.timestamp
        })
    }

    /// Power state changes of a node with `from <= timestamp <= to`.
    pub fn state_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PowerStateChanged>, EventStoreError> {
        self.node_rows(keys::STATE_PREFIX, node_id, from, to, |e: &PowerStateChanged| {
            e.timestamp
        })
    }

    /// Whether the node ever had a confirmed transition to `Down`.
    pub fn has_power_down(&self, node_id: NodeId) -> Result<bool, EventStoreError> {
        let rows = self
            .kv
            .read()
            .prefix_scan(&keys::node_prefix(keys::STATE_PREFIX, node_id))?;
        for (_, value) in rows {
            let event: PowerStateChanged = decode(&value)?;
            if event.state == Power::Down {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every node with at least one confirmed transition to `Down`.
    pub fn power_managed_nodes(&self) -> Result<BTreeSet<NodeId>, EventStoreError> {
        let rows = self.kv.read().prefix_scan(keys::STATE_PREFIX)?;
        let mut nodes = BTreeSet::new();
        for (_, value) in rows {
            let event: PowerStateChanged = decode(&value)?;
            if event.state == Power::Down {
                nodes.insert(event.node_id);
            }
        }
        Ok(nodes)
    }

    // =========================================================================
    // POWER SNAPSHOTS
    // =========================================================================

    /// Insert snapshots that do not exist yet. Returns how many were written.
    pub fn insert_power_states(
        &self,
        snapshots: &[PowerStateSnapshot],
    ) -> Result<usize, EventStoreError> {
        let mut kv = self.kv.write();
        let mut ops = Vec::new();
        let mut seen = HashSet::new();
        for snapshot in snapshots {
            let key = keys::power_key(snapshot.node_id, snapshot.block);
            if kv.exists(&key)? || !seen.insert(key.clone()) {
                continue;
            }
            ops.push(BatchOperation::put(key, encode(snapshot)?));
        }

        let written = ops.len();
        if written > 0 {
            kv.atomic_batch_write(ops)?;
        }
        Ok(written)
    }

    /// Nodes that already have a snapshot at `block`.
    pub fn snapshot_nodes_at(&self, block: BlockNumber) -> Result<HashSet<NodeId>, EventStoreError> {
        let rows = self.kv.read().prefix_scan(keys::POWER_PREFIX)?;
        let mut nodes = HashSet::new();
        for (key, _) in rows {
            if keys::block_from_power_key(&key) == Some(block) {
                let node = keys::node_from_key(&key).ok_or(EventStoreError::MalformedKey {
                    key: key.clone(),
                })?;
                nodes.insert(node);
            }
        }
        Ok(nodes)
    }

    /// Snapshot of a node taken within `tolerance` seconds of `at`, the
    /// closest one if several qualify.
    pub fn power_snapshot_near(
        &self,
        node_id: NodeId,
        at: Timestamp,
        tolerance: f64,
    ) -> Result<Option<PowerStateSnapshot>, EventStoreError> {
        let candidates = self.node_rows(
            keys::POWER_PREFIX,
            node_id,
            at - tolerance,
            at + tolerance,
            |s: &PowerStateSnapshot| s.timestamp,
        )?;
        Ok(candidates.into_iter().min_by(|a, b| {
            (a.timestamp - at)
                .abs()
                .total_cmp(&(b.timestamp - at).abs())
        }))
    }

    // =========================================================================
    // NODE IDENTITIES
    // =========================================================================

    pub fn node_identity(&self, node_id: NodeId) -> Result<Option<NodeIdentity>, EventStoreError> {
        let raw = self.kv.read().get(&keys::node_key(node_id))?;
        raw.map(|bytes| decode(&bytes)).transpose()
    }

    pub fn node_by_address(&self, address: &str) -> Result<Option<NodeId>, EventStoreError> {
        let raw = self.kv.read().get(&keys::account_key(address))?;
        raw.map(|bytes| decode(&bytes)).transpose()
    }

    /// Store an identity unless the node is already known. Returns whether it was written.
    pub fn insert_node_identity(&self, identity: &NodeIdentity) -> Result<bool, EventStoreError> {
        let node_key = keys::node_key(identity.node_id);
        let mut kv = self.kv.write();
        if kv.exists(&node_key)? {
            return Ok(false);
        }
        kv.atomic_batch_write(vec![
            BatchOperation::put(node_key, encode(identity)?),
            BatchOperation::put(
                keys::account_key(&identity.address),
                encode(&identity.node_id)?,
            ),
        ])?;
        Ok(true)
    }

    // =========================================================================
    // CHECKPOINT
    // =========================================================================

    pub fn checkpoint(&self) -> Result<Option<Checkpoint>, EventStoreError> {
        let kv = self.kv.read();
        let block = kv.get(&keys::meta_key(keys::CHECKPOINT_BLOCK))?;
        let time = kv.get(&keys::meta_key(keys::CHECKPOINT_TIME))?;
        match (block, time) {
            (Some(block), Some(time)) => Ok(Some(Checkpoint {
                block: decode(&block)?,
                time: decode(&time)?,
            })),
            _ => Ok(None),
        }
    }

    pub fn set_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), EventStoreError> {
        self.kv.write().atomic_batch_write(vec![
            BatchOperation::put(
                keys::meta_key(keys::CHECKPOINT_BLOCK),
                encode(&checkpoint.block)?,
            ),
            BatchOperation::put(
                keys::meta_key(keys::CHECKPOINT_TIME),
                encode(&checkpoint.time)?,
            ),
        ])?;
        Ok(())
    }

    /// Move the checkpoint forward over consecutive processed blocks.
    ///
    /// Continues from the stored checkpoint when it already covers `start`,
    /// otherwise counts from `start`. Returns the checkpoint in effect.
    pub fn advance_checkpoint(
        &self,
        start: BlockNumber,
    ) -> Result<Option<Checkpoint>, EventStoreError> {
        let current = self.checkpoint()?;
        let mut next = match current {
            Some(cp) if cp.block + 1 >= start => cp.block + 1,
            _ => start,
        };

        let mut reached = None;
        while let Some(time) = self.processed_timestamp(next)? {
            reached = Some(Checkpoint { block: next, time });
            next += 1;
        }

        match reached {
            Some(cp) => {
                self.set_checkpoint(cp)?;
                tracing::debug!("[fv-01] Checkpoint advanced to block {}", cp.block);
                Ok(Some(cp))
            }
            None => Ok(current),
        }
    }
}

//! # Serialized Writer
//!
//! The only task that mutates the event store. Workers, the snapshotter
//! and the node directory hand it jobs through an unbounded channel; it
//! applies them one by one on a blocking thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use fv_01_event_store::{BlockWrite, CommitOutcome, EventStore, KeyValueStore};
use shared_types::{NodeIdentity, PowerStateSnapshot};

use crate::domain::{IngestionError, WriterStats};

/// A unit of work for the writer.
#[derive(Debug, Clone)]
pub enum WriteJob {
    /// A block's events plus its processed marker.
    Block(BlockWrite),
    /// Insert-if-absent batch of power snapshots.
    PowerSnapshot(Vec<PowerStateSnapshot>),
    /// Insert-if-absent node identity.
    Identity(NodeIdentity),
}

enum Message {
    Job(WriteJob),
    Close,
}

struct Shared {
    pending: AtomicUsize,
    drained: Notify,
}

impl Shared {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Cloneable submission handle.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::UnboundedSender<Message>,
    shared: Arc<Shared>,
}

impl WriterHandle {
    pub fn submit(&self, job: WriteJob) -> Result<(), IngestionError> {
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Message::Job(job)).is_err() {
            self.shared.finish_one();
            return Err(IngestionError::WriterClosed);
        }
        Ok(())
    }

    /// Jobs submitted but not yet applied.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Resolves once every submitted job has been applied.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.shared.drained.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Ask the writer to stop after the jobs already submitted.
    pub fn close(&self) {
        let _ = self.tx.send(Message::Close);
    }
}

/// Start the writer. It stops on `close` or once every handle is dropped;
/// the join handle yields its counters.
pub fn spawn_writer<S>(store: Arc<EventStore<S>>) -> (WriterHandle, JoinHandle<WriterStats>)
where
    S: KeyValueStore + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = WriterHandle {
        tx,
        shared: Arc::new(Shared {
            pending: AtomicUsize::new(0),
            drained: Notify::new(),
        }),
    };

    let shared = Arc::clone(&handle.shared);
    let task = tokio::task::spawn_blocking(move || {
        let mut stats = WriterStats::default();
        while let Some(message) = rx.blocking_recv() {
            match message {
                Message::Job(job) => {
                    apply(&store, job, &mut stats);
                    shared.finish_one();
                }
                Message::Close => break,
            }
        }
        debug!("[fv-02] Writer stopped: {:?}", stats);
        stats
    });

    (handle, task)
}

fn apply<S: KeyValueStore>(store: &EventStore<S>, job: WriteJob, stats: &mut WriterStats) {
    match job {
        WriteJob::Block(write) => {
            let number = write.block.number;
            match store.commit_block(&write) {
                Ok(CommitOutcome::Committed { events }) => {
                    stats.blocks_committed += 1;
                    stats.events_written += events;
                }
                Ok(CommitOutcome::AlreadyProcessed) => {
                    stats.conflicts += 1;
                    debug!("[fv-02] Block {} already processed, write skipped", number);
                }
                Err(e) => {
                    stats.failures += 1;
                    warn!("[fv-02] Failed to commit block {}: {}", number, e);
                }
            }
        }
        WriteJob::PowerSnapshot(batch) => match store.insert_power_states(&batch) {
            Ok(written) => stats.snapshots_written += written,
            Err(e) => {
                stats.failures += 1;
                warn!("[fv-02] Failed to write {} power snapshots: {}", batch.len(), e);
            }
        },
        WriteJob::Identity(identity) => match store.insert_node_identity(&identity) {
            Ok(true) => stats.identities_written += 1,
            Ok(false) => {}
            Err(e) => {
                stats.failures += 1;
                warn!(
                    "[fv-02] Failed to store identity of node {}: {}",
                    identity.node_id, e
                );
            }
        },
    }
}

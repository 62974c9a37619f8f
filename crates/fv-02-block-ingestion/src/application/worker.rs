//! # Block Worker
//!
//! Pulls block numbers from the shared queue, fetches and decodes them,
//! and hands the result to the writer. A failure leaves the block
//! unprocessed for the next backlog pass; the worker keeps going.

use std::sync::Arc;
use tracing::{debug, warn};

use fv_01_event_store::{BlockWrite, EventStore, KeyValueStore};
use shared_types::{BlockNumber, BlockRef};

use crate::algorithms::{decode_events, NodeRef};
use crate::application::node_directory::NodeDirectory;
use crate::application::writer::{WriteJob, WriterHandle};
use crate::domain::{BlockQueue, IngestionError, QueueItem};
use crate::ports::BlockSource;

/// Everything a worker needs. Cheap to clone; one clone per spawned task.
pub struct Worker<S: KeyValueStore, B: BlockSource> {
    pub source: Arc<B>,
    pub store: Arc<EventStore<S>>,
    pub queue: Arc<BlockQueue>,
    pub writer: WriterHandle,
    pub directory: Arc<NodeDirectory<S, B>>,
}

impl<S: KeyValueStore, B: BlockSource> Clone for Worker<S, B> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            queue: Arc::clone(&self.queue),
            writer: self.writer.clone(),
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<S: KeyValueStore, B: BlockSource> Worker<S, B> {
    /// Run until a shutdown message arrives.
    pub async fn run(self, id: usize) {
        debug!("[fv-02] Worker {} started", id);
        while let Some(item) = self.queue.pop().await {
            match item {
                QueueItem::Shutdown => {
                    self.queue.task_done();
                    break;
                }
                QueueItem::Block(number) => {
                    if let Err(e) = self.handle_block(number).await {
                        warn!("[fv-02] Worker {} failed on block {}: {}", id, number, e);
                    }
                    // After submitting, so the writer's pending count is
                    // raised before the queue can report idle.
                    self.queue.task_done();
                }
            }
        }
        debug!("[fv-02] Worker {} stopped", id);
    }

    async fn handle_block(&self, number: BlockNumber) -> Result<(), IngestionError> {
        if self.store.is_processed(number)? {
            return Ok(());
        }
        let write = self.process_block(number).await?;
        self.writer.submit(WriteJob::Block(write))
    }

    /// Fetch and decode one block.
    pub async fn process_block(&self, number: BlockNumber) -> Result<BlockWrite, IngestionError> {
        let raw = self.source.get_block_by_number(number).await?;
        let timestamp = self.source.get_timestamp(&raw).await?;
        let raw_events = self.source.get_events(&raw.hash).await?;

        let block = BlockRef {
            number,
            hash: raw.hash,
            timestamp,
        };

        let mut events = Vec::new();
        for decoded in decode_events(&block, &raw_events) {
            match &decoded.node {
                NodeRef::Id(_) => events.push(decoded.event),
                NodeRef::Account(address) => {
                    match self.directory.resolve(address, &block.hash).await? {
                        Some(node_id) => events.push(decoded.resolve(node_id)),
                        None => debug!(
                            "[fv-02] Dropping event from account {} without node in block {}",
                            address, number
                        ),
                    }
                }
            }
        }

        Ok(BlockWrite::new(block, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::writer::spawn_writer;
    use crate::ports::{MockBlockSource, RawEvent};
    use fv_01_event_store::InMemoryKVStore;
    use serde_json::json;
    use shared_types::ChainEvent;

    fn worker(
        source: Arc<MockBlockSource>,
        store: Arc<EventStore<InMemoryKVStore>>,
        writer: WriterHandle,
    ) -> Worker<InMemoryKVStore, MockBlockSource> {
        let directory = Arc::new(NodeDirectory::new(
            Arc::clone(&source),
            Arc::clone(&store),
            writer.clone(),
        ));
        Worker {
            source,
            store,
            queue: Arc::new(BlockQueue::new()),
            writer,
            directory,
        }
    }

    #[tokio::test]
    async fn test_process_block_resolves_accounts() {
        let source = Arc::new(MockBlockSource::new());
        source.register_account("5Acc", 5, 50);
        source.register_account("5Lonely", 6, 0);
        source.push_block(
            10,
            vec![
                RawEvent {
                    event_id: "NodeUptimeReported".to_string(),
                    attributes: json!(["5Acc", 1, 100]),
                },
                RawEvent {
                    event_id: "NodeUptimeReported".to_string(),
                    attributes: json!(["5Lonely", 1, 100]),
                },
                RawEvent {
                    event_id: "NodeUptimeReported".to_string(),
                    attributes: json!([8, 1, 100]),
                },
            ],
        );
        let store = Arc::new(EventStore::new(InMemoryKVStore::new()));
        let (writer, _task) = spawn_writer(Arc::clone(&store));
        let worker = worker(source, store, writer);

        let write = worker.process_block(10).await.unwrap();
        assert_eq!(write.block.timestamp, MockBlockSource::timestamp_of(10));
        let nodes: Vec<_> = write.events.iter().map(ChainEvent::node_id).collect();
        assert_eq!(nodes, vec![50, 8]);
        let indices: Vec<_> = write.events.iter().map(ChainEvent::event_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_worker_loop_processes_and_survives_failures() {
        let source = Arc::new(MockBlockSource::new());
        source.push_empty_blocks(1, 3);
        source.fail_block(2, 1);
        let store = Arc::new(EventStore::new(InMemoryKVStore::new()));
        let (writer, task) = spawn_writer(Arc::clone(&store));
        let worker = worker(source, Arc::clone(&store), writer.clone());
        let queue = Arc::clone(&worker.queue);

        for n in 1..=3 {
            queue.push(n);
        }
        queue.push_shutdown();
        let handle = tokio::spawn(worker.run(0));

        queue.wait_idle().await;
        handle.await.unwrap();
        writer.wait_drained().await;

        assert!(store.is_processed(1).unwrap());
        assert!(!store.is_processed(2).unwrap());
        assert!(store.is_processed(3).unwrap());

        writer.close();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_block_with_corrupt_event_is_still_committed() {
        let source = Arc::new(MockBlockSource::new());
        source.push_block(
            4,
            vec![
                RawEvent {
                    event_id: "PowerTargetChanged".to_string(),
                    attributes: json!({"farm_id": 1, "node_id": 8, "power_target": "Sideways"}),
                },
                RawEvent {
                    event_id: "NodeUptimeReported".to_string(),
                    attributes: json!([8, 1, 100]),
                },
            ],
        );
        let store = Arc::new(EventStore::new(InMemoryKVStore::new()));
        let (writer, task) = spawn_writer(Arc::clone(&store));
        let worker = worker(source, Arc::clone(&store), writer.clone());
        let queue = Arc::clone(&worker.queue);

        queue.push(4);
        queue.push_shutdown();
        let handle = tokio::spawn(worker.run(0));

        queue.wait_idle().await;
        handle.await.unwrap();
        writer.wait_drained().await;

        assert!(store.is_processed(4).unwrap());
        let uptimes = store.uptime_events(8, 0.0, f64::MAX).unwrap();
        assert_eq!(uptimes.len(), 1);
        assert_eq!(uptimes[0].event_index, 1);
        assert!(store.target_events(8, 0.0, f64::MAX).unwrap().is_empty());

        writer.close();
        task.await.unwrap();
    }
}

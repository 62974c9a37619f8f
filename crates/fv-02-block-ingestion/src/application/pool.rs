//! # Worker Pool
//!
//! Tracks live worker tasks and applies the scaling policy.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use fv_01_event_store::KeyValueStore;

use crate::algorithms::{plan_scaling, ScaleAction};
use crate::application::worker::Worker;
use crate::ports::BlockSource;

pub struct WorkerPool<S: KeyValueStore + 'static, B: BlockSource + 'static> {
    template: Worker<S, B>,
    handles: Vec<JoinHandle<()>>,
    next_id: usize,
    min_workers: usize,
    max_workers: usize,
}

impl<S: KeyValueStore + 'static, B: BlockSource + 'static> WorkerPool<S, B> {
    pub fn new(template: Worker<S, B>, min_workers: usize, max_workers: usize) -> Self {
        Self {
            template,
            handles: Vec::new(),
            next_id: 0,
            min_workers,
            max_workers,
        }
    }

    pub fn spawn(&mut self, count: usize) {
        for _ in 0..count {
            let worker = self.template.clone();
            let id = self.next_id;
            self.next_id += 1;
            self.handles.push(tokio::spawn(worker.run(id)));
        }
    }

    /// Workers whose task has not finished.
    pub fn live(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Forget finished workers. Returns how many were dropped.
    pub fn reap(&mut self) -> usize {
        let before = self.handles.len();
        self.handles.retain(|h| !h.is_finished());
        before - self.handles.len()
    }

    /// Apply the scaling policy against the current queue depth.
    pub fn scale(&mut self) -> ScaleAction {
        let queue = Arc::clone(&self.template.queue);
        let action = plan_scaling(
            queue.depth(),
            self.live(),
            queue.pending_shutdowns(),
            self.min_workers,
            self.max_workers,
        );
        match action {
            ScaleAction::Shrink(n) => {
                info!("[fv-02] Queue cleared, scaling down by {} workers", n);
                for _ in 0..n {
                    queue.push_shutdown();
                }
            }
            ScaleAction::Grow(n) => {
                info!("[fv-02] Scaling up by {} workers", n);
                self.spawn(n);
            }
            ScaleAction::Hold => {}
        }
        action
    }

    /// Stop every worker after the items already queued, and wait for them.
    pub async fn shutdown(&mut self) {
        self.reap();
        let queue = &self.template.queue;
        let outstanding = self.handles.len().saturating_sub(queue.pending_shutdowns());
        for _ in 0..outstanding {
            queue.push_shutdown();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }

    /// Stop every worker immediately. In-flight blocks are abandoned.
    pub async fn abort(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::node_directory::NodeDirectory;
    use crate::application::writer::spawn_writer;
    use crate::domain::BlockQueue;
    use crate::ports::MockBlockSource;
    use fv_01_event_store::{EventStore, InMemoryKVStore};
    use std::time::Duration;

    fn pool(min: usize, max: usize) -> WorkerPool<InMemoryKVStore, MockBlockSource> {
        let source = Arc::new(MockBlockSource::new());
        let store = Arc::new(EventStore::new(InMemoryKVStore::new()));
        let (writer, _task) = spawn_writer(Arc::clone(&store));
        let directory = Arc::new(NodeDirectory::new(
            Arc::clone(&source),
            Arc::clone(&store),
            writer.clone(),
        ));
        WorkerPool::new(
            Worker {
                source,
                store,
                queue: Arc::new(BlockQueue::new()),
                writer,
                directory,
            },
            min,
            max,
        )
    }

    #[tokio::test]
    async fn test_grow_to_min_then_shrink_back() {
        let mut pool = pool(2, 8);
        assert_eq!(pool.scale(), ScaleAction::Grow(2));
        assert_eq!(pool.live(), 2);

        pool.spawn(3);
        assert_eq!(pool.live(), 5);
        assert_eq!(pool.scale(), ScaleAction::Shrink(3));

        // shutdowns already queued are not requested twice
        assert_eq!(pool.scale(), ScaleAction::Hold);

        let queue = Arc::clone(&pool.template.queue);
        tokio::time::timeout(Duration::from_secs(2), queue.wait_idle())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.reap(), 3);
        assert_eq!(pool.live(), 2);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_grow_to_max_on_deep_queue() {
        let mut pool = pool(1, 4);
        for n in 1000..1010 {
            pool.template.queue.push(n);
        }
        // blocks are unknown to the mock ledger; workers just log and move on
        assert_eq!(pool.scale(), ScaleAction::Grow(4));
        pool.abort().await;
    }
}

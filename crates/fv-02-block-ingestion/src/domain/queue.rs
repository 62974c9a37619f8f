//! # Block Queue
//!
//! Shared work queue between the scheduler and the workers.
//!
//! - Pushing a block number that is already waiting is a no-op.
//! - `QueueItem::Shutdown` stops exactly one worker.
//! - Every popped item must be acknowledged with `task_done`, which lets
//!   the scheduler wait until everything queued has been attempted.

use parking_lot::Mutex as SyncMutex;
use shared_types::BlockNumber;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex, Notify};

/// One unit of worker input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItem {
    Block(BlockNumber),
    Shutdown,
}

pub struct BlockQueue {
    queued: SyncMutex<HashSet<BlockNumber>>,
    tx: mpsc::UnboundedSender<QueueItem>,
    rx: Mutex<mpsc::UnboundedReceiver<QueueItem>>,
    pending_shutdowns: AtomicUsize,
    unfinished: AtomicUsize,
    idle: Notify,
}

impl Default for BlockQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            queued: SyncMutex::new(HashSet::new()),
            tx,
            rx: Mutex::new(rx),
            pending_shutdowns: AtomicUsize::new(0),
            unfinished: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    /// Queue a block. Returns `false` if it was already waiting.
    pub fn push(&self, block: BlockNumber) -> bool {
        let mut queued = self.queued.lock();
        if !queued.insert(block) {
            return false;
        }
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        // The receiver lives as long as `self`.
        let _ = self.tx.send(QueueItem::Block(block));
        true
    }

    /// Queue a message that stops one worker.
    pub fn push_shutdown(&self) {
        self.pending_shutdowns.fetch_add(1, Ordering::SeqCst);
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(QueueItem::Shutdown);
    }

    /// Wait for the next item.
    pub async fn pop(&self) -> Option<QueueItem> {
        let item = self.rx.lock().await.recv().await?;
        match item {
            QueueItem::Block(block) => {
                self.queued.lock().remove(&block);
            }
            QueueItem::Shutdown => {
                self.pending_shutdowns.fetch_sub(1, Ordering::SeqCst);
            }
        }
        Some(item)
    }

    /// Acknowledge a popped item.
    pub fn task_done(&self) {
        if self.unfinished.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Blocks waiting to be picked up.
    pub fn depth(&self) -> usize {
        self.queued.lock().len()
    }

    /// Shutdown messages not yet picked up.
    pub fn pending_shutdowns(&self) -> usize {
        self.pending_shutdowns.load(Ordering::SeqCst)
    }

    /// Items pushed but not yet acknowledged.
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::SeqCst)
    }

    /// Resolves once every pushed item has been acknowledged.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }
}

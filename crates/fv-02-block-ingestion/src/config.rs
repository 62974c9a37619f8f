//! # Ingestion Configuration
//!
//! Tuning knobs for the worker pool, retry passes and the power snapshotter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default lower bound of the worker pool.
pub const MIN_WORKERS: usize = 2;

/// Default upper bound of the worker pool.
pub const MAX_WORKERS: usize = 50;

/// Default control tick.
pub const SCALE_INTERVAL_SECS: u64 = 30;

/// Default number of retry passes in bounded mode.
pub const RETRY_PASSES: usize = 3;

/// Margin added to an end timestamp before looking up the end block.
pub const INGEST_POST_PERIOD_SECS: u64 = 60 * 60;

/// Ingestion pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Workers kept alive while the queue is short.
    pub min_workers: usize,

    /// Hard cap on concurrent workers.
    pub max_workers: usize,

    /// Control tick in milliseconds (progress log, reap, scale).
    pub scale_interval_ms: u64,

    /// Backlog reloads after the first drain in bounded mode.
    pub retry_passes: usize,

    /// Seconds added to an end timestamp when resolving the end block.
    pub post_period_secs: u64,

    /// Snapshots per writer job.
    pub snapshot_batch_size: usize,

    /// Log snapshot progress every N node ids.
    pub snapshot_progress_every: u32,

    /// Capture power snapshots at the first block of the window.
    pub take_snapshots: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            min_workers: MIN_WORKERS,
            max_workers: MAX_WORKERS,
            scale_interval_ms: SCALE_INTERVAL_SECS * 1000,
            retry_passes: RETRY_PASSES,
            post_period_secs: INGEST_POST_PERIOD_SECS,
            snapshot_batch_size: 100,
            snapshot_progress_every: 500,
            take_snapshots: true,
        }
    }
}

impl IngestionConfig {
    /// Create a config for testing (small pool, fast ticks).
    pub fn for_testing() -> Self {
        Self {
            min_workers: 1,
            max_workers: 4,
            scale_interval_ms: 10,
            retry_passes: 3,
            post_period_secs: INGEST_POST_PERIOD_SECS,
            snapshot_batch_size: 3,
            snapshot_progress_every: 500,
            take_snapshots: true,
        }
    }

    pub fn scale_interval(&self) -> Duration {
        Duration::from_millis(self.scale_interval_ms)
    }
}

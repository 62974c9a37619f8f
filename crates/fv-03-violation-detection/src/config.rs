//! # Detection Configuration
//!
//! Time constants of the farmerbot rules and the size of the check pool.

use serde::{Deserialize, Serialize};

use shared_types::Timestamp;

use crate::domain::{MAX_BOOT_TIME_SECS, PERIOD_CATCH_SECS, POST_PERIOD_SECS};

/// Violation detection configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// How long past the period end a node may still prove its boot.
    pub post_period_secs: u64,

    /// Tolerance when matching a power snapshot to the period start.
    pub period_catch_secs: u64,

    /// Seconds a node has to boot after a wake-up request.
    pub max_boot_time_secs: u64,

    /// Threads for `check_nodes_parallel`. Zero uses the global rayon pool.
    pub worker_threads: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            post_period_secs: POST_PERIOD_SECS,
            period_catch_secs: PERIOD_CATCH_SECS,
            max_boot_time_secs: MAX_BOOT_TIME_SECS,
            worker_threads: 0,
        }
    }
}

impl DetectionConfig {
    /// Create a config for testing (small dedicated pool).
    pub fn for_testing() -> Self {
        Self {
            worker_threads: 2,
            ..Self::default()
        }
    }

    pub fn post_period(&self) -> Timestamp {
        self.post_period_secs as Timestamp
    }

    pub fn period_catch(&self) -> Timestamp {
        self.period_catch_secs as Timestamp
    }

    pub fn max_boot_time(&self) -> Timestamp {
        self.max_boot_time_secs as Timestamp
    }
}

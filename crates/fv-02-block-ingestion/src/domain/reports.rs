//! # Value Objects
//!
//! Block ranges and the summaries returned by the pipeline's components.

use shared_types::{BlockNumber, Checkpoint};

/// Resolved scan window. `end == None` means follow the chain head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub start: BlockNumber,
    pub end: Option<BlockNumber>,
}

impl ScanRange {
    pub fn bounded(start: BlockNumber, end: BlockNumber) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn tail(start: BlockNumber) -> Self {
        Self { start, end: None }
    }

    pub fn is_bounded(&self) -> bool {
        self.end.is_some()
    }
}

/// Counters kept by the serialized writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub blocks_committed: usize,
    pub events_written: usize,
    /// Block jobs for blocks that were already processed.
    pub conflicts: usize,
    pub failures: usize,
    pub snapshots_written: usize,
    pub identities_written: usize,
}

/// Outcome of one power snapshot run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub block: BlockNumber,
    pub node_count: u32,
    /// Nodes that already had a snapshot at `block`.
    pub skipped: usize,
    /// Snapshots handed to the writer.
    pub submitted: usize,
    /// Nodes whose power could not be read.
    pub failed: usize,
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionReport {
    pub range: ScanRange,
    /// Blocks of the range still unprocessed at exit. Always 0 in tail mode.
    pub missing: usize,
    pub checkpoint: Option<Checkpoint>,
    pub writer: WriterStats,
    pub snapshot: Option<SnapshotReport>,
}

impl IngestionReport {
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

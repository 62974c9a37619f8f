//! # Write Records
//!
//! Units of work handed to the store by the serialized writer.

use serde::{Deserialize, Serialize};
use shared_types::{BlockRef, ChainEvent, Timestamp};

/// Everything derived from one block. Committed as a single atomic batch
/// together with the block's processed marker.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockWrite {
    pub block: BlockRef,
    pub events: Vec<ChainEvent>,
}

impl BlockWrite {
    pub fn new(block: BlockRef, events: Vec<ChainEvent>) -> Self {
        Self { block, events }
    }

    /// A block with nothing of interest still needs its marker.
    pub fn empty(block: BlockRef) -> Self {
        Self::new(block, Vec::new())
    }
}

/// Result of committing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Events and marker were written.
    Committed { events: usize },
    /// The block was already marked processed; nothing was written.
    AlreadyProcessed,
}

/// Value stored under a processed-block marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProcessedMarker {
    pub timestamp: Timestamp,
}

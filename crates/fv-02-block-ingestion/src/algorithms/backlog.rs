//! # Backlog Calculation
//!
//! Blocks of a range that still need ingesting.

use shared_types::BlockNumber;
use std::collections::BTreeSet;

/// `{start..=end} \ processed`, ascending. Empty when `end < start`.
pub fn missing_blocks(
    start: BlockNumber,
    end: BlockNumber,
    processed: &BTreeSet<BlockNumber>,
) -> Vec<BlockNumber> {
    if end < start {
        return Vec::new();
    }

    let mut missing = Vec::new();
    let mut done = processed.range(start..=end).copied().peekable();
    for block in start..=end {
        if done.peek() == Some(&block) {
            done.next();
        } else {
            missing.push(block);
        }
    }
    missing
}

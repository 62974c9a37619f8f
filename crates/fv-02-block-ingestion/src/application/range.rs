//! # Range Resolution
//!
//! Turns the operator's start/end options into block numbers.

use tracing::info;

use shared_types::{BlockNumber, Period, Timestamp};

use crate::config::IngestionConfig;
use crate::domain::{IngestionError, ScanRange};
use crate::ports::BlockSource;

/// Start and end as given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeRequest {
    pub start_block: Option<BlockNumber>,
    pub start_time: Option<Timestamp>,
    pub end_block: Option<BlockNumber>,
    pub end_time: Option<Timestamp>,
}

impl RangeRequest {
    /// Whether the run stops at a fixed end block.
    pub fn is_bounded(&self) -> bool {
        self.end_block.is_some() || self.end_time.is_some()
    }
}

/// Resolve the scan window.
///
/// Start: explicit block, else the block at the start timestamp, else the
/// block at the start of the current minting period. End: explicit block,
/// else the block at `end_time + post_period`; none means tail mode.
pub async fn resolve_range<B: BlockSource + ?Sized>(
    source: &B,
    request: &RangeRequest,
    config: &IngestionConfig,
) -> Result<ScanRange, IngestionError> {
    let start = match (request.start_block, request.start_time) {
        (Some(block), _) => block,
        (None, Some(ts)) => source.find_block_for_timestamp(ts).await?,
        (None, None) => {
            let period = Period::current();
            info!(
                "[fv-02] No start given, scanning from the current period start ({})",
                period.start
            );
            source.find_block_for_timestamp(period.start).await?
        }
    };

    let end = match (request.end_block, request.end_time) {
        (Some(block), _) => Some(block),
        (None, Some(ts)) => Some(
            source
                .find_block_for_timestamp(ts + config.post_period_secs as Timestamp)
                .await?,
        ),
        (None, None) => None,
    };

    match end {
        Some(end) if end < start => Err(IngestionError::InvalidRange { start, end }),
        Some(end) => Ok(ScanRange::bounded(start, end)),
        None => Ok(ScanRange::tail(start)),
    }
}

//! # Minting Periods
//!
//! Fixed-length accounting windows over which node compliance is judged.
//! The first period started at `FIRST_PERIOD_START`; every period lasts one
//! twelfth of an average (leap-year inclusive) year.

use serde::{Deserialize, Serialize};

use crate::entities::Timestamp;

/// Start of period zero, in seconds since the Unix epoch.
pub const FIRST_PERIOD_START: i64 = 1_522_501_000;

/// Length of one period in seconds.
pub const STANDARD_PERIOD_DURATION: i64 = 24 * 60 * 60 * (365 * 3 + 366) / 4 / 12;

/// One minting period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Number of periods since period zero.
    pub offset: i64,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Period {
    /// Period with the given offset.
    pub fn at_offset(offset: i64) -> Self {
        let start = FIRST_PERIOD_START + offset * STANDARD_PERIOD_DURATION;
        Self {
            offset,
            start: start as Timestamp,
            end: (start + STANDARD_PERIOD_DURATION) as Timestamp,
        }
    }

    /// Period containing `timestamp`. The end boundary belongs to the next period.
    pub fn containing(timestamp: Timestamp) -> Self {
        let elapsed = timestamp.floor() as i64 - FIRST_PERIOD_START;
        Self::at_offset(elapsed.div_euclid(STANDARD_PERIOD_DURATION))
    }

    /// Period containing the current wall-clock time.
    pub fn current() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self::containing(now)
    }

    pub fn previous(&self) -> Self {
        Self::at_offset(self.offset - 1)
    }

    pub fn next(&self) -> Self {
        Self::at_offset(self.offset + 1)
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

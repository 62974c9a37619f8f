//! # FV-03 Violation Detection
//!
//! Finds farmerbot violations: power-managed nodes that took longer than
//! the allowed boot time to come back up after a wake-up request.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Rules
//!
//! | Rule | Value |
//! |------|-------|
//! | Boot allowance after a wake-up request | 30 minutes |
//! | Horizon past the period end | 27 hours, capped by the ingestion checkpoint |
//! | Snapshot match at the period start | ±30 seconds |
//! | Replay order | `(timestamp, event_index)` |
//!
//! A violation with a boot time is final. One without is still open: the
//! node has not proven a boot yet and may do so before the horizon.
//!
//! Checks are pure reads. Running one twice gives the same answer as
//! long as the store did not change.
//!
//! ## Module Structure
//!
//! ```text
//! fv-03-violation-detection/
//! ├── domain/          # ReplayState, NodeCheck, rule constants, errors
//! ├── algorithms/      # check_node replay
//! ├── ports/           # EventSource (outbound)
//! ├── adapters/        # EventSource for EventStore
//! ├── application/     # ViolationDetector
//! └── config.rs        # DetectionConfig
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use algorithms::{check_node, observation_end, replay};
pub use application::{recent_periods, ViolationDetector};
pub use config::DetectionConfig;
pub use domain::{
    NodeCheck, ReplayState, ViolationError, MAX_BOOT_TIME_SECS, PERIOD_CATCH_SECS,
    POST_PERIOD_SECS,
};
pub use ports::EventSource;

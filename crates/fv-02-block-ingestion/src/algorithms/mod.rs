//! # Algorithms
//!
//! Pure functions used by the pipeline: event decoding, backlog
//! calculation and the worker scaling policy.

pub mod backlog;
pub mod decode;
pub mod scaling;

pub use backlog::missing_blocks;
pub use decode::{block_timestamp, decode_events, DecodedEvent, NodeRef};
pub use scaling::{plan_scaling, ScaleAction};

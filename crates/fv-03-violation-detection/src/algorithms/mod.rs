//! # Algorithms
//!
//! Replay logic over the `EventSource` port.

pub mod replay;

pub use replay::{check_node, observation_end, replay};

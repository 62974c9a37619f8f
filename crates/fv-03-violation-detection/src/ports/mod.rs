//! # Ports
//!
//! Dependencies of the detector.

pub mod outbound;

pub use outbound::*;

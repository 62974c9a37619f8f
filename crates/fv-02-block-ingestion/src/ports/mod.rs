//! # Ports
//!
//! Outbound dependencies of Block Ingestion.

pub mod outbound;

pub use outbound::*;

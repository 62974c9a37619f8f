//! # Ports Module
//!
//! Driven ports of the Event Store.

pub mod outbound;

pub use outbound::*;

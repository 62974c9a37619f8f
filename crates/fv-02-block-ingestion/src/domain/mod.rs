//! # Domain Module
//!
//! Errors, the block queue and value objects of Block Ingestion.

pub mod errors;
pub mod queue;
pub mod reports;

pub use errors::*;
pub use queue::*;
pub use reports::*;

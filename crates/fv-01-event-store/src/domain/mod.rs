//! # Domain Module
//!
//! Errors, key layout and write records of the Event Store.

pub mod errors;
pub mod keys;
pub mod records;

pub use errors::*;
pub use records::*;

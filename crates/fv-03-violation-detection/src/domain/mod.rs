//! # Domain Module
//!
//! Core domain types for Violation Detection.

pub mod errors;
pub mod results;
pub mod state;

pub use errors::*;
pub use results::*;
pub use state::*;

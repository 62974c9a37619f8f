//! # Shared Types Crate
//!
//! Domain entities shared by the event store, the ingestion pipeline and
//! the violation engine.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **Append-only events**: event entities are never mutated once decoded.
//! - **Ledger time**: all timestamps are block times in seconds.

pub mod entities;
pub mod errors;
pub mod period;

pub use entities::*;
pub use errors::*;
pub use period::*;

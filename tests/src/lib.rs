//! # Farmerbot Violation Ingester Test Suite
//!
//! Cross-crate flows: a mock ledger is ingested into an event store and
//! the violation engine runs over the result.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Scripted ledger with known violations
//! └── integration/
//!     ├── flows.rs      # Ledger → pipeline → detector
//!     └── durability.rs # RocksDB reopen, insertion order
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fv-tests
//! cargo test -p fv-tests integration::flows::
//! ```

pub mod fixtures;
pub mod integration;

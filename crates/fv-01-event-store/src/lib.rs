//! # Event Store (fv-01)
//!
//! Durable store for everything the ingester extracts from the ledger and
//! the violation engine reads back.
//!
//! ## Tables
//!
//! ```text
//! NodeUptimeReported ──┐
//! PowerTargetChanged ──┼──→ one atomic batch per block ──→ ProcessedBlocks
//! PowerStateChanged  ──┘
//!
//! PowerState (snapshots)     insert-if-absent per (node, block)
//! Nodes / account index      insert-if-absent per node
//! kv                         checkpoint_block, checkpoint_time
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Atomic Blocks | Events and processed marker commit together or not at all |
//! | 2 | Idempotent Commits | A processed block is never written twice |
//! | 3 | Immutable Snapshots | A `(node, block)` snapshot is never overwritten |
//! | 4 | Contiguous Checkpoint | Every block from the scan start to the checkpoint is processed |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Errors, key layout, write records
//! - `ports/` - `KeyValueStore` SPI
//! - `adapters/` - In-memory and RocksDB backends
//! - `service.rs` - `EventStore` repository
//!
//! ## Usage
//!
//! ```ignore
//! use fv_01_event_store::{BlockWrite, EventStore, InMemoryKVStore};
//!
//! let store = EventStore::new(InMemoryKVStore::new());
//! store.commit_block(&BlockWrite::new(block, events))?;
//! let cp = store.advance_checkpoint(start_block)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::{BlockWrite, CommitOutcome, EventStoreError, KVStoreError};
pub use ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
pub use service::EventStore;

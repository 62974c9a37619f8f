//! # Adapters
//!
//! Key-value backends: in-memory for tests, RocksDB for production.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use rocks::{RocksDbConfig, RocksDbStore};

//! # Ingester Runtime
//!
//! Wiring for the two executables.
//!
//! ## Startup Sequence (`ingester`)
//!
//! 1. Parse arguments, apply `FV_*` overrides, install tracing
//! 2. Open the RocksDB event store (fatal on failure)
//! 3. Connect to the ledger bridge and read the head (fatal on failure)
//! 4. Resolve the scan window and run bounded or tail mode
//! 5. Exit 0 when done, 2 when blocks remain unprocessed, 1 on startup errors
//!
//! ## Modules
//!
//! - `cli` - clap argument structs
//! - `config` - `RuntimeConfig` and environment overrides
//! - `http_source` - `BlockSource` over the ledger bridge
//! - `ingest` - bounded/tail run and exit outcome
//! - `logging` - tracing subscriber
//! - `output` - violation report formatting

pub mod cli;
pub mod config;
pub mod http_source;
pub mod ingest;
pub mod logging;
pub mod output;

pub use cli::{FindViolationsArgs, IngesterArgs};
pub use config::{RuntimeConfig, SourceConfig};
pub use http_source::HttpBlockSource;
pub use ingest::{run_ingestion, wait_for_shutdown, RunOutcome};
pub use logging::init_tracing;
pub use output::{format_violation, format_violations};

//! # FV-02 Block Ingestion
//!
//! Resumable, horizontally scaled block scanner feeding the event store.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Data Flow
//!
//! ```text
//! backlog / subscriber ──→ BlockQueue ──→ Worker × N ──→ Writer ──→ EventStore
//!                          (dedup)        (fetch+decode)  (one atomic
//!                                                          batch per block)
//! PowerSnapshotter ────────────────────────────────────→ Writer
//! ```
//!
//! ## Guarantees
//!
//! | ID | Guarantee | Description |
//! |----|-----------|-------------|
//! | 1 | At-least-once | A failed block stays unprocessed and is picked up by the next backlog pass |
//! | 2 | Idempotent storage | Duplicate work never writes twice |
//! | 3 | Single writer | Every store mutation goes through one task |
//! | 4 | Bounded pool | Worker count stays within `[min_workers, max_workers]` |
//!
//! ## Module Structure
//!
//! ```text
//! fv-02-block-ingestion/
//! ├── domain/          # Errors, BlockQueue, reports
//! ├── algorithms/      # Decoding, backlog, scaling policy
//! ├── ports/           # BlockSource + MockBlockSource
//! ├── application/     # Writer, workers, pool, snapshotter, subscriber, pipeline
//! └── config.rs        # IngestionConfig
//! ```

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use algorithms::{
    block_timestamp, decode_events, missing_blocks, plan_scaling, DecodedEvent, NodeRef,
    ScaleAction,
};
pub use application::{
    resolve_range, IngestionPipeline, NodeDirectory, PowerSnapshotter, RangeRequest, WriteJob,
    WriterHandle,
};
pub use config::IngestionConfig;
pub use domain::{
    BlockQueue, IngestionError, IngestionReport, QueueItem, ScanRange, SnapshotReport,
    SourceError, WriterStats,
};
pub use ports::{BlockSource, HeaderCallback, MockBlockSource, NodePower, RawBlock, RawEvent};

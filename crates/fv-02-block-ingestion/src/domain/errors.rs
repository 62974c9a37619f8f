//! # Domain Errors
//!
//! Error types for Block Ingestion.

use fv_01_event_store::EventStoreError;
use shared_types::{BlockNumber, DecodeError};
use thiserror::Error;

/// Errors raised by a `BlockSource`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The ledger could not be reached.
    #[error("Source unreachable: {0}")]
    Unreachable(String),

    /// The connection dropped; `reconnect` is required.
    #[error("Disconnected from source")]
    Disconnected,

    /// No block at this height.
    #[error("Block {0} not found")]
    BlockNotFound(BlockNumber),

    /// The source answered with something we cannot use.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Block data could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors surfaced by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Block source error: {0}")]
    Source(#[from] SourceError),

    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),

    /// The serialized writer is no longer accepting jobs.
    #[error("Writer channel closed")]
    WriterClosed,

    /// End block before start block.
    #[error("Invalid block range: start {start} > end {end}")]
    InvalidRange { start: BlockNumber, end: BlockNumber },

    /// A background task panicked or was cancelled.
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

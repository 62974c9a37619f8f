//! # Domain Errors
//!
//! Error types for Violation Detection.

use fv_01_event_store::EventStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViolationError {
    /// Nothing has been ingested yet, so there is no observation horizon.
    #[error("No checkpoint in the event store")]
    MissingCheckpoint,

    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),

    /// The dedicated check pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

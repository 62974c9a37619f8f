//! # Domain Errors
//!
//! Error types for the Event Store.
//!
//! ## Design Principles
//!
//! - Backend failures are wrapped, never swallowed here
//! - Duplicate commits are an outcome, not an error (see `CommitOutcome`)

use thiserror::Error;

/// Key-value backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Write attempted on a handle opened read-only.
    #[error("KV store is open read-only")]
    ReadOnly,
}

/// Errors surfaced by `EventStore`.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Backend failure.
    #[error("Store backend error: {0}")]
    Backend(#[from] KVStoreError),

    /// A value could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// A key did not have the expected layout.
    #[error("Malformed key: {key:?}")]
    MalformedKey { key: Vec<u8> },
}

impl From<bincode::Error> for EventStoreError {
    fn from(err: bincode::Error) -> Self {
        EventStoreError::Serialization {
            message: err.to_string(),
        }
    }
}

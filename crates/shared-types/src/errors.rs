//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

use crate::entities::BlockNumber;

/// Errors raised while turning raw ledger data into domain entities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The block carries no readable timestamp inherent.
    #[error("Block {block} has no timestamp inherent")]
    MissingTimestamp { block: BlockNumber },

    /// An event attribute is missing or has the wrong shape.
    #[error("Malformed {event} attribute '{field}' in block {block}")]
    MalformedAttribute {
        event: String,
        field: String,
        block: BlockNumber,
    },

    /// Unknown power value.
    #[error("Unknown power value: {0}")]
    UnknownPower(String),
}

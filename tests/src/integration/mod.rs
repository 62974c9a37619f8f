//! # Integration Tests

pub mod durability;
pub mod flows;

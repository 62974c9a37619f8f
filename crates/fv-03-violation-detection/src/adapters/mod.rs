//! # Adapters
//!
//! `EventSource` implementations.

pub mod event_store;

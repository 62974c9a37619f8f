//! # Application Layer
//!
//! The detector service.

pub mod service;

pub use service::{recent_periods, ViolationDetector};

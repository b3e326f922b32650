//! Core types and rules for the HealthSync measurement service.
//!
//! This crate has no HTTP or token dependencies. It owns
//! the metric catalogue, the structural and semantic validation of submitted
//! measurements, the batch aggregation policy, and the persistence contract.

pub mod batch;
pub mod error;
pub mod identity;
pub mod measurement;
pub mod metric;
pub mod parse;
pub mod store;
pub mod validate;

pub use error::{Error, Result};

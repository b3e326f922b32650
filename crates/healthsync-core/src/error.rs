//! Error types for `healthsync-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The batch contained no candidates; nothing was validated.
  #[error("Measurements array cannot be empty")]
  EmptyBatch,

  #[error("invalid value range: min {min} exceeds max {max}")]
  InvalidRange { min: f64, max: f64 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

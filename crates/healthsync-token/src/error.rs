//! Error types for the token codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The token failed verification. Expired and malformed tokens are not
  /// told apart.
  #[error("token is invalid")]
  TokenInvalid,

  #[error("unsupported signing algorithm: {0}")]
  UnsupportedAlgorithm(String),

  #[error("signing secret must not be empty")]
  EmptySecret,

  /// The lifetime does not fit in a timestamp.
  #[error("token lifetime out of range: {0} minutes")]
  InvalidTtl(i64),

  #[error("failed to sign token: {0}")]
  Signing(#[source] jsonwebtoken::errors::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

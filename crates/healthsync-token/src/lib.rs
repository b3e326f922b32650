//! Signed, time-limited identity tokens for HealthSync.
//!
//! Tokens are HMAC-signed JWTs carrying a subject, an optional email, and an
//! absolute expiry. Verification never says *why* a token was refused: a bad
//! signature, a foreign algorithm, a malformed structure and an expired token
//! all produce the same [`Error::TokenInvalid`].
//!
//! # Quick start
//!
//! ```no_run
//! use healthsync_core::identity::Identity;
//! use healthsync_token::{TokenCodec, TokenConfig};
//!
//! let codec = TokenCodec::new(&TokenConfig::default()).unwrap();
//! let token = codec.issue(&Identity::new("user-1"), None).unwrap();
//! let claims = codec.verify(&token).unwrap();
//! assert_eq!(claims.sub.as_deref(), Some("user-1"));
//! ```

mod codec;
pub mod error;

pub use codec::{Claims, DEVELOPMENT_SECRET, TokenCodec, TokenConfig, ttl_from_minutes};
pub use error::{Error, Result};

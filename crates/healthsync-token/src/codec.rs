//! JWT issuance and verification.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use healthsync_core::identity::Identity;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The well-known placeholder secret. Fine for local development, never for
/// a deployment.
pub const DEVELOPMENT_SECRET: &str = "your-secret-key-here-change-in-production";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Signing parameters, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
  pub secret:      String,
  /// One of `HS256`, `HS384`, `HS512`.
  pub algorithm:   String,
  /// Lifetime of tokens issued without an explicit TTL.
  pub ttl_minutes: i64,
}

impl Default for TokenConfig {
  fn default() -> Self {
    Self {
      secret:      DEVELOPMENT_SECRET.to_string(),
      algorithm:   "HS256".to_string(),
      ttl_minutes: 30,
    }
  }
}

// ─── Claims ──────────────────────────────────────────────────────────────────

/// The payload of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// Subject identifier. Verification does not require it; callers that
  /// need an identity must reject tokens without one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sub:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  /// Expiry as seconds since the Unix epoch.
  pub exp:   i64,
}

impl Claims {
  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.exp, 0)
  }
}

// ─── Codec ───────────────────────────────────────────────────────────────────

/// Issues and verifies tokens with one secret and one algorithm.
#[derive(Clone)]
pub struct TokenCodec {
  algorithm:   Algorithm,
  encoding:    EncodingKey,
  decoding:    DecodingKey,
  validation:  Validation,
  default_ttl: TimeDelta,
}

impl fmt::Debug for TokenCodec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenCodec")
      .field("algorithm", &self.algorithm)
      .field("default_ttl", &self.default_ttl)
      .finish_non_exhaustive()
  }
}

impl TokenCodec {
  pub fn new(config: &TokenConfig) -> Result<Self> {
    if config.secret.is_empty() {
      return Err(Error::EmptySecret);
    }
    let algorithm = hmac_algorithm(&config.algorithm)?;
    let default_ttl = ttl_from_minutes(config.ttl_minutes)?;

    let mut validation = Validation::new(algorithm);
    // Expiry is checked in `verify_at` against an injectable clock, with an
    // exclusive boundary.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    Ok(Self {
      algorithm,
      encoding: EncodingKey::from_secret(config.secret.as_bytes()),
      decoding: DecodingKey::from_secret(config.secret.as_bytes()),
      validation,
      default_ttl,
    })
  }

  pub fn algorithm(&self) -> Algorithm { self.algorithm }

  pub fn default_ttl(&self) -> TimeDelta { self.default_ttl }

  /// Issue a token for `identity`, valid for `ttl` (or the configured
  /// default). A negative `ttl` yields an already-expired token.
  pub fn issue(&self, identity: &Identity, ttl: Option<TimeDelta>) -> Result<String> {
    self.issue_at(identity, ttl, Utc::now())
  }

  pub fn issue_at(
    &self,
    identity: &Identity,
    ttl:      Option<TimeDelta>,
    now:      DateTime<Utc>,
  ) -> Result<String> {
    let ttl = ttl.unwrap_or(self.default_ttl);
    let expires_at = now
      .checked_add_signed(ttl)
      .ok_or(Error::InvalidTtl(ttl.num_minutes()))?;
    self.sign(&Claims {
      sub:   Some(identity.subject.clone()),
      email: identity.email.clone(),
      exp:   expires_at.timestamp(),
    })
  }

  /// Sign arbitrary claims.
  pub fn sign(&self, claims: &Claims) -> Result<String> {
    encode(&Header::new(self.algorithm), claims, &self.encoding).map_err(Error::Signing)
  }

  /// Verify `token` against the current time.
  pub fn verify(&self, token: &str) -> Result<Claims> {
    self.verify_at(token, Utc::now())
  }

  /// Verify signature, algorithm and structure, then require `exp > now`.
  /// A token whose expiry equals `now` is already expired.
  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
    let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
      tracing::debug!(kind = ?e.kind(), "token failed verification");
      Error::TokenInvalid
    })?;

    if data.claims.exp <= now.timestamp() {
      tracing::debug!(exp = data.claims.exp, "token expired");
      return Err(Error::TokenInvalid);
    }

    Ok(data.claims)
  }
}

/// Convert a configured lifetime, refusing values no timestamp can hold.
pub fn ttl_from_minutes(minutes: i64) -> Result<TimeDelta> {
  TimeDelta::try_minutes(minutes).ok_or(Error::InvalidTtl(minutes))
}

/// Only the HMAC family makes sense with a shared secret.
fn hmac_algorithm(name: &str) -> Result<Algorithm> {
  match name.parse::<Algorithm>() {
    Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
    _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn codec() -> TokenCodec {
    TokenCodec::new(&TokenConfig::default()).unwrap()
  }

  fn codec_with(secret: &str, algorithm: &str) -> TokenCodec {
    TokenCodec::new(&TokenConfig {
      secret:      secret.to_string(),
      algorithm:   algorithm.to_string(),
      ttl_minutes: 30,
    })
    .unwrap()
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
  }

  fn alice() -> Identity {
    Identity::new("alice").with_email("alice@example.com")
  }

  #[test]
  fn issued_token_verifies_with_its_claims() {
    let c = codec();
    let token = c.issue_at(&alice(), None, now()).unwrap();
    let claims = c.verify_at(&token, now()).unwrap();
    assert_eq!(claims.sub.as_deref(), Some("alice"));
    assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
    assert_eq!(claims.expires_at(), Some(now() + TimeDelta::minutes(30)));
  }

  #[test]
  fn issue_uses_the_wall_clock() {
    let c = codec();
    let token = c.issue(&Identity::new("bob"), None).unwrap();
    let claims = c.verify(&token).unwrap();
    assert_eq!(claims.sub.as_deref(), Some("bob"));
    assert_eq!(claims.email, None);
  }

  #[test]
  fn explicit_ttl_overrides_the_default() {
    let c = codec();
    let token = c.issue_at(&alice(), Some(TimeDelta::hours(2)), now()).unwrap();
    let claims = c.verify_at(&token, now()).unwrap();
    assert_eq!(claims.exp, (now() + TimeDelta::hours(2)).timestamp());
  }

  #[test]
  fn expiry_equal_to_now_is_rejected() {
    let c = codec();
    let token = c.issue_at(&alice(), Some(TimeDelta::zero()), now()).unwrap();
    assert!(matches!(c.verify_at(&token, now()), Err(Error::TokenInvalid)));
  }

  #[test]
  fn expiry_one_second_ahead_is_accepted() {
    let c = codec();
    let token = c.issue_at(&alice(), Some(TimeDelta::seconds(1)), now()).unwrap();
    assert!(c.verify_at(&token, now()).is_ok());
    assert!(c.verify_at(&token, now() + TimeDelta::seconds(1)).is_err());
  }

  #[test]
  fn negative_ttl_is_already_expired() {
    let c = codec();
    let token = c.issue(&alice(), Some(TimeDelta::minutes(-1))).unwrap();
    assert!(matches!(c.verify(&token), Err(Error::TokenInvalid)));
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let token = codec().issue_at(&alice(), None, now()).unwrap();
    let other = codec_with("another-secret", "HS256");
    assert!(matches!(other.verify_at(&token, now()), Err(Error::TokenInvalid)));
  }

  #[test]
  fn foreign_algorithm_is_rejected() {
    let strong = codec_with(DEVELOPMENT_SECRET, "HS512");
    let token = strong.issue_at(&alice(), None, now()).unwrap();
    assert!(strong.verify_at(&token, now()).is_ok());
    assert!(matches!(codec().verify_at(&token, now()), Err(Error::TokenInvalid)));
  }

  #[test]
  fn tampered_payload_is_rejected() {
    let c = codec();
    let token = c.issue_at(&alice(), None, now()).unwrap();
    let forged_payload = c
      .sign(&Claims { sub: Some("mallory".into()), email: None, exp: i64::MAX / 2 })
      .unwrap();
    let mut parts: Vec<&str> = token.split('.').collect();
    parts[1] = forged_payload.split('.').nth(1).unwrap();
    let spliced = parts.join(".");
    assert!(matches!(c.verify_at(&spliced, now()), Err(Error::TokenInvalid)));
  }

  #[test]
  fn garbage_is_rejected() {
    let c = codec();
    for token in ["", "not-a-token", "a.b.c", "...."] {
      assert!(matches!(c.verify_at(token, now()), Err(Error::TokenInvalid)), "{token:?}");
    }
  }

  #[test]
  fn missing_expiry_is_rejected() {
    let token = encode(
      &Header::new(Algorithm::HS256),
      &serde_json::json!({ "sub": "alice" }),
      &EncodingKey::from_secret(DEVELOPMENT_SECRET.as_bytes()),
    )
    .unwrap();
    assert!(matches!(codec().verify_at(&token, now()), Err(Error::TokenInvalid)));
  }

  #[test]
  fn subjectless_token_still_verifies() {
    let c = codec();
    let exp = (now() + TimeDelta::minutes(5)).timestamp();
    let token = c.sign(&Claims { sub: None, email: None, exp }).unwrap();
    let claims = c.verify_at(&token, now()).unwrap();
    assert_eq!(claims.sub, None);
  }

  #[test]
  fn expired_and_malformed_look_the_same() {
    let c = codec();
    let expired = c.issue_at(&alice(), Some(TimeDelta::minutes(-1)), now()).unwrap();
    let expired_err = c.verify_at(&expired, now()).unwrap_err().to_string();
    let malformed_err = c.verify_at("junk", now()).unwrap_err().to_string();
    assert_eq!(expired_err, malformed_err);
  }

  #[test]
  fn only_hmac_algorithms_are_configurable() {
    for name in ["HS256", "HS384", "HS512"] {
      assert!(TokenCodec::new(&TokenConfig { algorithm: name.into(), ..Default::default() }).is_ok());
    }
    for name in ["RS256", "ES256", "none", "hs256"] {
      let err = TokenCodec::new(&TokenConfig { algorithm: name.into(), ..Default::default() })
        .unwrap_err();
      assert!(matches!(err, Error::UnsupportedAlgorithm(_)), "{name}");
    }
  }

  #[test]
  fn empty_secret_is_refused() {
    let err = TokenCodec::new(&TokenConfig { secret: String::new(), ..Default::default() })
      .unwrap_err();
    assert!(matches!(err, Error::EmptySecret));
  }

  #[test]
  fn unrepresentable_default_ttl_is_refused() {
    let err = TokenCodec::new(&TokenConfig { ttl_minutes: i64::MAX, ..Default::default() })
      .unwrap_err();
    assert!(matches!(err, Error::InvalidTtl(i64::MAX)));
    assert!(ttl_from_minutes(i64::MIN).is_err());
    assert_eq!(ttl_from_minutes(90).unwrap(), TimeDelta::minutes(90));
  }

  #[test]
  fn expiry_past_the_calendar_is_refused() {
    let c = codec();
    let huge = TimeDelta::minutes(1_000_000_000_000);
    let err = c.issue_at(&alice(), Some(huge), now()).unwrap_err();
    assert!(matches!(err, Error::InvalidTtl(1_000_000_000_000)));
    assert!(c.issue_at(&alice(), Some(-huge), now()).is_err());
  }

  #[test]
  fn debug_output_hides_keys() {
    let rendered = format!("{:?}", codec());
    assert!(!rendered.contains(DEVELOPMENT_SECRET));
    assert!(rendered.contains("HS256"));
  }
}

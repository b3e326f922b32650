//! Bearer-token extractor and standalone verifier.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use healthsync_core::{identity::Identity, store::MeasurementStore};
use healthsync_token::TokenCodec;
use thiserror::Error;

use crate::{AppState, error::ApiError};

/// The only accepted authorization scheme (matched case-insensitively).
pub const BEARER_SCHEME: &str = "Bearer";

/// Why a request was not authenticated.
///
/// The two variants carry the two messages clients see: one for "you sent no
/// credential", one for "your credential is no good".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
  /// No usable `Authorization: Bearer <token>` header.
  #[error("Not authenticated")]
  MissingCredentials,
  /// A token was presented but failed verification or names no subject.
  #[error("Could not validate credentials")]
  InvalidCredentials,
}

/// The identity behind a verified bearer token. Present in a handler means
/// the request was authenticated.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

/// Pull the raw token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(AuthError::MissingCredentials)?;

  let (scheme, credentials) = header_val
    .split_once(' ')
    .ok_or(AuthError::MissingCredentials)?;

  if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
    return Err(AuthError::MissingCredentials);
  }

  match credentials.trim() {
    "" => Err(AuthError::MissingCredentials),
    token => Ok(token),
  }
}

/// Verify the request's bearer token and name its subject.
pub fn authenticate(headers: &HeaderMap, codec: &TokenCodec) -> Result<Identity, AuthError> {
  let token = bearer_token(headers)?;
  let claims = codec
    .verify(token)
    .map_err(|_| AuthError::InvalidCredentials)?;

  let subject = claims
    .sub
    .filter(|s| !s.trim().is_empty())
    .ok_or(AuthError::InvalidCredentials)?;

  Ok(Identity { subject, email: claims.email })
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: MeasurementStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, &state.codec)
      .map(Authenticated)
      .map_err(|e| {
        tracing::debug!(reason = ?e, "authentication failed");
        ApiError::Unauthenticated(e)
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderValue, Request};
  use chrono::{TimeDelta, Utc};
  use healthsync_token::{Claims, TokenConfig};

  use crate::test_support::make_state;

  fn codec() -> TokenCodec {
    TokenCodec::new(&TokenConfig::default()).unwrap()
  }

  fn headers(value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    map
  }

  fn bearer(token: &str) -> HeaderMap {
    headers(&format!("Bearer {token}"))
  }

  #[test]
  fn valid_token_yields_identity() {
    let c = codec();
    let token = c.issue(&Identity::new("user-1").with_email("u1@example.com"), None).unwrap();
    let identity = authenticate(&bearer(&token), &c).unwrap();
    assert_eq!(identity.subject, "user-1");
    assert_eq!(identity.email.as_deref(), Some("u1@example.com"));
  }

  #[test]
  fn scheme_is_case_insensitive() {
    let c = codec();
    let token = c.issue(&Identity::new("user-1"), None).unwrap();
    assert!(authenticate(&headers(&format!("bearer {token}")), &c).is_ok());
  }

  #[test]
  fn missing_header() {
    assert_eq!(
      authenticate(&HeaderMap::new(), &codec()),
      Err(AuthError::MissingCredentials)
    );
  }

  #[test]
  fn malformed_headers_count_as_missing() {
    let c = codec();
    for value in ["Bearer", "Bearer ", "Bearer    ", "Basic dXNlcjpwYXNz", "Token abc", "abc"] {
      assert_eq!(
        authenticate(&headers(value), &c),
        Err(AuthError::MissingCredentials),
        "{value:?}"
      );
    }
  }

  #[test]
  fn bad_token_is_invalid_not_missing() {
    assert_eq!(
      authenticate(&bearer("not-a-jwt"), &codec()),
      Err(AuthError::InvalidCredentials)
    );
  }

  #[test]
  fn expired_token_is_invalid() {
    let c = codec();
    let token = c.issue(&Identity::new("user-1"), Some(TimeDelta::minutes(-1))).unwrap();
    assert_eq!(authenticate(&bearer(&token), &c), Err(AuthError::InvalidCredentials));
  }

  #[test]
  fn token_without_subject_is_invalid() {
    let c = codec();
    let exp = (Utc::now() + TimeDelta::minutes(5)).timestamp();
    for sub in [None, Some(String::new())] {
      let token = c.sign(&Claims { sub, email: Some("x@example.com".into()), exp }).unwrap();
      assert_eq!(authenticate(&bearer(&token), &c), Err(AuthError::InvalidCredentials));
    }
  }

  #[test]
  fn messages_match_the_wire_contract() {
    assert_eq!(AuthError::MissingCredentials.to_string(), "Not authenticated");
    assert_eq!(AuthError::InvalidCredentials.to_string(), "Could not validate credentials");
  }

  #[tokio::test]
  async fn extractor_uses_the_state_codec() {
    let state = make_state();
    let token = state.codec.issue(&Identity::new("user-9"), None).unwrap();
    let req = Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {token}"))
      .body(axum::body::Body::empty())
      .unwrap();
    let (mut parts, _) = req.into_parts();
    let Authenticated(identity) = Authenticated::from_request_parts(&mut parts, &state)
      .await
      .unwrap();
    assert_eq!(identity.subject, "user-9");
  }

  #[tokio::test]
  async fn extractor_rejects_without_header() {
    let state = make_state();
    let req = Request::builder().body(axum::body::Body::empty()).unwrap();
    let (mut parts, _) = req.into_parts();
    let err = Authenticated::from_request_parts(&mut parts, &state).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(AuthError::MissingCredentials)));
  }
}

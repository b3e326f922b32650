//! Error types and axum `IntoResponse` implementation.
//!
//! Every error body has the shape `{"detail": ...}`.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use healthsync_core::{batch::RejectionDetail, metric::MetricType};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Unauthenticated(#[from] AuthError),

  #[error("Measurements array cannot be empty")]
  EmptyBatch,

  /// The body could not be read as a JSON array.
  #[error("{0}")]
  InvalidBody(String),

  /// Every item in the batch was rejected.
  #[error("every measurement in the batch was rejected")]
  Rejected(Vec<RejectionDetail>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

/// Why server state could not be built from [`crate::ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error(transparent)]
  Token(#[from] healthsync_token::Error),

  #[error("unknown metric type '{0}' in ranges")]
  UnknownMetric(String),

  #[error("bad range for {metric}: {source}")]
  Range {
    metric: MetricType,
    #[source]
    source: healthsync_core::Error,
  },
}

impl From<healthsync_core::Error> for ApiError {
  fn from(e: healthsync_core::Error) -> Self {
    match e {
      healthsync_core::Error::EmptyBatch => ApiError::EmptyBatch,
      healthsync_core::Error::Store(source) => ApiError::Store(source),
      other => ApiError::Internal(other.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthenticated(e) => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "detail": e.to_string() }))).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer"),
        );
        res
      }
      ApiError::EmptyBatch => {
        (StatusCode::BAD_REQUEST, Json(json!({ "detail": self.to_string() }))).into_response()
      }
      ApiError::InvalidBody(msg) => {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": msg }))).into_response()
      }
      ApiError::Rejected(details) => {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": details }))).into_response()
      }
      ApiError::Store(_) | ApiError::Internal(_) => {
        tracing::error!(error = %self, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "detail": "Internal server error" })),
        )
          .into_response()
      }
    }
  }
}

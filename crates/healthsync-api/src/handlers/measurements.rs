//! Handler for `/v1/measurements` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/v1/measurements/bulk` | Body: JSON array of measurements; 201, 207, 400, 401 or 422 |
//!
//! Status codes for a bulk submission:
//!
//! - `201 Created` when every item is accepted
//! - `207 Multi-Status` when some items are accepted and some rejected
//! - `422 Unprocessable Entity` when no item is accepted
//! - `400 Bad Request` for an empty array

use axum::{
  Json,
  body::Bytes,
  extract::{State, rejection::BytesRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use healthsync_core::{
  batch::{self, BatchOutcome, BatchStatus, RejectionDetail},
  measurement::AcceptedRecord,
  store::MeasurementStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// Body of a `201` or `207` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkCreateResponse {
  pub success_count: usize,
  pub failed_count:  usize,
  pub measurements:  Vec<AcceptedRecord>,
  /// `null` when nothing was rejected.
  pub errors:        Option<Vec<RejectionDetail>>,
}

impl From<BatchOutcome> for BulkCreateResponse {
  fn from(outcome: BatchOutcome) -> Self {
    Self {
      success_count: outcome.success_count,
      failed_count:  outcome.failed_count,
      measurements:  outcome.measurements,
      errors:        (!outcome.errors.is_empty()).then_some(outcome.errors),
    }
  }
}

/// The body is read as a JSON array whatever its `Content-Type`.
fn parse_items(body: &[u8]) -> Result<Vec<Value>, ApiError> {
  serde_json::from_slice(body)
    .map_err(|e| ApiError::InvalidBody(format!("Input should be a valid list: {e}")))
}

/// `POST /v1/measurements/bulk`
pub async fn create_bulk<S>(
  State(state): State<AppState<S>>,
  Authenticated(identity): Authenticated,
  body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError>
where
  S: MeasurementStore + Clone + 'static,
{
  let body = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
  let items = parse_items(&body)?;

  let outcome = batch::submit(state.store.as_ref(), &state.rules, &items, Utc::now()).await?;

  tracing::info!(
    subject = %identity.subject,
    total_count = outcome.total(),
    success_count = outcome.success_count,
    failed_count = outcome.failed_count,
    "bulk measurement creation completed"
  );

  let status = match outcome.status() {
    BatchStatus::Created => StatusCode::CREATED,
    BatchStatus::Partial => StatusCode::MULTI_STATUS,
    BatchStatus::Rejected => return Err(ApiError::Rejected(outcome.errors)),
  };
  Ok((status, Json(BulkCreateResponse::from(outcome))).into_response())
}

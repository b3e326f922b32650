//! `GET /health`: unauthenticated liveness probe.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SERVICE_NAME;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
  pub status:    String,
  pub timestamp: DateTime<Utc>,
  pub version:   String,
  pub service:   String,
}

pub async fn handler() -> Json<HealthStatus> {
  let response = HealthStatus {
    status:    "healthy".to_string(),
    timestamp: Utc::now(),
    version:   env!("CARGO_PKG_VERSION").to_string(),
    service:   SERVICE_NAME.to_string(),
  };
  tracing::debug!(status = %response.status, "health check requested");
  Json(response)
}

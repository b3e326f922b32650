//! Measurement shapes, from raw candidate to accepted record.
//!
//! A [`MeasurementCandidate`] is what structural parsing yields; a
//! [`Measurement`] is a candidate that passed every rule; an
//! [`AcceptedRecord`] is a measurement the store has stamped with an id.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metric::MetricType;

/// Free-form key/value data attached by the client. Insertion order is kept
/// and the contents are never interpreted.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A structurally well-formed submission that has not been checked against
/// any rule yet. `metric_type` is still an unresolved string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementCandidate {
  pub metric_type: String,
  pub value:       f64,
  pub unit:        String,
  /// Offset as supplied; naive input is assigned `+00:00`.
  pub measured_at: DateTime<FixedOffset>,
  pub device_id:   Option<String>,
  pub metadata:    Option<Metadata>,
  pub notes:       Option<String>,
}

/// A candidate that satisfied every validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
  pub metric_type: MetricType,
  pub value:       f64,
  pub unit:        String,
  pub measured_at: DateTime<FixedOffset>,
  pub device_id:   Option<String>,
  pub metadata:    Option<Metadata>,
  pub notes:       Option<String>,
}

/// A measurement with the identity and creation time assigned on acceptance.
///
/// `created_at` is server time and unrelated to `measured_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedRecord {
  pub id:          Uuid,
  #[serde(flatten)]
  pub measurement: Measurement,
  pub created_at:  DateTime<Utc>,
}

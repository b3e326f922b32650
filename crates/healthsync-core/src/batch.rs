//! Batch aggregation: run every submitted item through parsing and
//! validation, and fold the per-item outcomes into one [`BatchOutcome`].
//!
//! A failing item never stops the batch. Structural problems may produce
//! several [`RejectionDetail`]s for one item (one per field); a rule
//! violation always produces exactly one, without a field path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  measurement::{AcceptedRecord, Measurement},
  metric::Ruleset,
  parse::{FieldError, parse_candidate},
  store::MeasurementStore,
  validate::{RuleViolation, validate},
};

// ─── Per-item outcome ────────────────────────────────────────────────────────

/// What happened to one submitted item.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
  Accepted(Measurement),
  /// The item did not have the required shape.
  Malformed(Vec<FieldError>),
  /// The item was well-formed but broke a rule.
  Rejected(RuleViolation),
}

/// Parse and validate one raw item.
pub fn assess(raw: &Value, rules: &Ruleset, now: DateTime<Utc>) -> CandidateOutcome {
  match parse_candidate(raw) {
    Err(errors) => CandidateOutcome::Malformed(errors),
    Ok(candidate) => match validate(candidate, rules, now) {
      Ok(measurement) => CandidateOutcome::Accepted(measurement),
      Err(violation) => CandidateOutcome::Rejected(violation),
    },
  }
}

// ─── Batch outcome ───────────────────────────────────────────────────────────

/// One reason an item was turned down, keyed by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionDetail {
  /// Zero-based position in the submitted array.
  pub index:   usize,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub field:   Option<String>,
}

/// How a batch came out overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
  /// Every item was accepted.
  Created,
  /// Some items were accepted and some rejected.
  Partial,
  /// No item was accepted.
  Rejected,
}

/// The result of one batch submission. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
  pub success_count: usize,
  /// Number of rejected items, not of rejection details.
  pub failed_count:  usize,
  /// Accepted records in submission order.
  pub measurements:  Vec<AcceptedRecord>,
  /// Rejection details in submission order.
  pub errors:        Vec<RejectionDetail>,
}

impl BatchOutcome {
  /// Total number of items the outcome covers.
  pub fn total(&self) -> usize { self.success_count + self.failed_count }

  pub fn status(&self) -> BatchStatus {
    match (self.success_count, self.failed_count) {
      (_, 0) => BatchStatus::Created,
      (0, _) => BatchStatus::Rejected,
      _ => BatchStatus::Partial,
    }
  }

  fn record(&mut self, index: usize, outcome: CandidateOutcome) -> Option<Measurement> {
    match outcome {
      CandidateOutcome::Accepted(measurement) => return Some(measurement),
      CandidateOutcome::Malformed(errors) => {
        self.errors.extend(errors.into_iter().map(|e| RejectionDetail {
          index,
          message: e.message,
          field: e.field,
        }));
      }
      CandidateOutcome::Rejected(violation) => {
        self.errors.push(RejectionDetail {
          index,
          message: violation.to_string(),
          field: None,
        });
      }
    }
    self.failed_count += 1;
    None
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Process `items` in order, saving every accepted measurement to `store`.
///
/// Fails with [`Error::EmptyBatch`] before doing any work if `items` is
/// empty, and with [`Error::Store`] if the store refuses a save. Per-item
/// problems are reported inside the returned [`BatchOutcome`].
pub async fn submit<S>(
  store: &S,
  rules: &Ruleset,
  items: &[Value],
  now:   DateTime<Utc>,
) -> Result<BatchOutcome>
where
  S: MeasurementStore,
{
  if items.is_empty() {
    return Err(Error::EmptyBatch);
  }

  let mut outcome = BatchOutcome::default();
  for (index, raw) in items.iter().enumerate() {
    let Some(measurement) = outcome.record(index, assess(raw, rules, now)) else {
      continue;
    };
    let record = store
      .save(measurement)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    outcome.measurements.push(record);
    outcome.success_count += 1;
  }

  tracing::debug!(
    total = items.len(),
    accepted = outcome.success_count,
    rejected = outcome.failed_count,
    details = outcome.errors.len(),
    "batch assessed"
  );

  Ok(outcome)
}

//! Semantic validation of a single measurement candidate.
//!
//! Rules run in a fixed order and the first violation wins, so every
//! rejected candidate carries exactly one message:
//!
//! 1. metric type resolution
//! 2. value sign
//! 3. unit membership
//! 4. plausible range
//! 5. not in the future

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::{
  measurement::{Measurement, MeasurementCandidate},
  metric::{MetricType, Ruleset, number},
};

/// The single rule a candidate failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleViolation {
  #[error("unknown metric type '{0}'")]
  UnknownMetricType(String),

  #[error("Value must be greater than 0, got {}", number(.value))]
  NotPositive { value: f64 },

  #[error(
    "Invalid unit '{unit}' for metric type {metric}. Valid units are: {}",
    joined(.accepted)
  )]
  InvalidUnit {
    unit:     String,
    metric:   MetricType,
    accepted: Vec<String>,
  },

  #[error(
    "Heart rate value {} is out of range. Expected range: {} to {}",
    number(.value), number(.min), number(.max)
  )]
  HeartRateOutOfRange { value: f64, min: f64, max: f64 },

  #[error(
    "Value {} is out of range for {metric}. Expected range: {} to {}",
    number(.value), number(.min), number(.max)
  )]
  OutOfRange {
    metric: MetricType,
    value:  f64,
    min:    f64,
    max:    f64,
  },

  #[error("Measurement date cannot be in the future")]
  InFuture { measured_at: DateTime<FixedOffset> },
}

fn joined(units: &[String]) -> String { units.join(", ") }

/// Check `candidate` against `rules` as of `now`.
///
/// Pure: the same inputs always produce the same result.
pub fn validate(
  candidate: MeasurementCandidate,
  rules:     &Ruleset,
  now:       DateTime<Utc>,
) -> Result<Measurement, RuleViolation> {
  let metric: MetricType = candidate
    .metric_type
    .parse()
    .map_err(|_| RuleViolation::UnknownMetricType(candidate.metric_type.clone()))?;

  // Counters skip the sign rule; their range starts at zero and catches
  // negatives instead.
  if candidate.value <= 0.0 && !metric.allows_zero() {
    return Err(RuleViolation::NotPositive { value: candidate.value });
  }

  let accepted = rules.units(metric);
  if !accepted.is_empty() && !accepted.contains(&candidate.unit.as_str()) {
    return Err(RuleViolation::InvalidUnit {
      unit: candidate.unit,
      metric,
      accepted: accepted.iter().map(|u| u.to_string()).collect(),
    });
  }

  let range = rules.range(metric);
  if !range.contains(candidate.value) {
    let (value, min, max) = (candidate.value, range.min(), range.max());
    return Err(match metric {
      MetricType::HeartRate => RuleViolation::HeartRateOutOfRange { value, min, max },
      _ => RuleViolation::OutOfRange { metric, value, min, max },
    });
  }

  // Exactly `now` is accepted.
  if candidate.measured_at.with_timezone(&Utc) > now {
    return Err(RuleViolation::InFuture { measured_at: candidate.measured_at });
  }

  Ok(Measurement {
    metric_type: metric,
    value:       candidate.value,
    unit:        candidate.unit,
    measured_at: candidate.measured_at,
    device_id:   candidate.device_id,
    metadata:    candidate.metadata,
    notes:       candidate.notes,
  })
}

//! Structural parsing of raw JSON submissions into [`MeasurementCandidate`]s.
//!
//! This stage only checks presence and basic shape, and it reports every
//! offending field rather than stopping at the first. Semantic rules live in
//! [`crate::validate`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::measurement::{MeasurementCandidate, Metadata};

const FIELD_REQUIRED: &str = "Field required";
const EXPECTED_DICT: &str = "Input should be a valid dictionary";
const EXPECTED_STRING: &str = "Input should be a valid string";
const EXPECTED_NUMBER: &str = "Input should be a valid number";
const UNPARSABLE_NUMBER: &str =
  "Input should be a valid number, unable to parse string as a number";
const EXPECTED_FINITE: &str = "Input should be a finite number";
const EXPECTED_DATETIME: &str = "Input should be a valid datetime";

/// One structural problem with a submitted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  /// Dotted path to the offending attribute; `None` when the item itself is
  /// the wrong shape.
  pub field:   Option<String>,
  pub message: String,
}

impl FieldError {
  fn at(field: &str, message: &str) -> Self {
    Self { field: Some(field.to_string()), message: message.to_string() }
  }
}

/// Coerce one raw item into a candidate, or list every field that prevents it.
pub fn parse_candidate(raw: &Value) -> Result<MeasurementCandidate, Vec<FieldError>> {
  let Some(object) = raw.as_object() else {
    return Err(vec![FieldError { field: None, message: EXPECTED_DICT.to_string() }]);
  };

  let mut errors = Vec::new();
  let metric_type = required(object, "metric_type", &mut errors, string);
  let value = required(object, "value", &mut errors, number);
  let unit = required(object, "unit", &mut errors, string);
  let measured_at = required(object, "measured_at", &mut errors, timestamp);
  let device_id = optional(object, "device_id", &mut errors, string);
  let metadata = optional(object, "metadata", &mut errors, dictionary);
  let notes = optional(object, "notes", &mut errors, string);

  match (metric_type, value, unit, measured_at) {
    (Some(metric_type), Some(value), Some(unit), Some(measured_at)) if errors.is_empty() => {
      Ok(MeasurementCandidate {
        metric_type,
        value,
        unit,
        measured_at,
        device_id,
        metadata,
        notes,
      })
    }
    _ => Err(errors),
  }
}

type Coerce<T> = fn(&Value) -> Result<T, &'static str>;

fn required<T>(
  object: &Map<String, Value>,
  field:  &str,
  errors: &mut Vec<FieldError>,
  coerce: Coerce<T>,
) -> Option<T> {
  let Some(raw) = object.get(field) else {
    errors.push(FieldError::at(field, FIELD_REQUIRED));
    return None;
  };
  coerce(raw)
    .map_err(|message| errors.push(FieldError::at(field, message)))
    .ok()
}

/// Absent and `null` both mean "not supplied".
fn optional<T>(
  object: &Map<String, Value>,
  field:  &str,
  errors: &mut Vec<FieldError>,
  coerce: Coerce<T>,
) -> Option<T> {
  match object.get(field) {
    None | Some(Value::Null) => None,
    Some(raw) => coerce(raw)
      .map_err(|message| errors.push(FieldError::at(field, message)))
      .ok(),
  }
}

// ─── Coercions ───────────────────────────────────────────────────────────────

fn string(raw: &Value) -> Result<String, &'static str> {
  raw.as_str().map(str::to_owned).ok_or(EXPECTED_STRING)
}

fn number(raw: &Value) -> Result<f64, &'static str> {
  let value = match raw {
    Value::Number(n) => n.as_f64().ok_or(EXPECTED_NUMBER)?,
    Value::String(s) => s.trim().parse::<f64>().map_err(|_| UNPARSABLE_NUMBER)?,
    _ => return Err(EXPECTED_NUMBER),
  };
  if value.is_finite() { Ok(value) } else { Err(EXPECTED_FINITE) }
}

fn dictionary(raw: &Value) -> Result<Metadata, &'static str> {
  raw.as_object().cloned().ok_or(EXPECTED_DICT)
}

fn timestamp(raw: &Value) -> Result<DateTime<FixedOffset>, &'static str> {
  match raw {
    Value::String(s) => parse_timestamp(s.trim()).ok_or(EXPECTED_DATETIME),
    Value::Number(n) => n
      .as_f64()
      .and_then(from_unix_epoch)
      .ok_or(EXPECTED_DATETIME),
    _ => Err(EXPECTED_DATETIME),
  }
}

/// Accepts RFC 3339, naive ISO-8601 date-times, and bare dates. Anything
/// without an offset is taken to be UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt);
  }
  for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
      return Some(naive.and_utc().fixed_offset());
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc().fixed_offset())
}

/// Epoch numbers with a magnitude above this are milliseconds, not seconds.
const MILLISECOND_WATERSHED: f64 = 2e10;

fn from_unix_epoch(epoch: f64) -> Option<DateTime<FixedOffset>> {
  if !epoch.is_finite() {
    return None;
  }
  let (seconds, nanos) = if epoch.abs() > MILLISECOND_WATERSHED {
    let millis = epoch.floor();
    (millis.div_euclid(1000.0), millis.rem_euclid(1000.0) * 1e6 + (epoch - millis) * 1e6)
  } else {
    let seconds = epoch.floor();
    (seconds, (epoch - seconds) * 1e9)
  };
  DateTime::from_timestamp(seconds as i64, nanos as u32).map(|dt| dt.fixed_offset())
}

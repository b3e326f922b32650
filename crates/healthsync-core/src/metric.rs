//! Metric types and the rule tables that describe them.
//!
//! Every [`MetricType`] has a non-empty list of accepted units and an
//! inclusive range of physiologically plausible values. Both tables are
//! built from exhaustive matches, so adding a variant without rules does not
//! compile.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{Error, Result};

// ─── Metric type ─────────────────────────────────────────────────────────────

/// The closed set of measurement kinds the service accepts.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  EnumCount,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricType {
  HeartRate,
  BloodPressureSystolic,
  BloodPressureDiastolic,
  BodyWeight,
  BodyTemperature,
  BloodGlucose,
  OxygenSaturation,
  Steps,
  Distance,
  CaloriesBurned,
}

impl MetricType {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Cumulative counters may legitimately read zero (a day without steps);
  /// every other metric must be strictly positive.
  pub fn allows_zero(self) -> bool {
    matches!(self, Self::Steps | Self::CaloriesBurned)
  }

  fn standard_units(self) -> &'static [&'static str] {
    match self {
      Self::HeartRate => &["bpm", "beats/min"],
      Self::BloodPressureSystolic => &["mmHg"],
      Self::BloodPressureDiastolic => &["mmHg"],
      Self::BodyWeight => &["kg", "lb"],
      Self::BodyTemperature => &["°C", "°F"],
      Self::BloodGlucose => &["mg/dL", "mmol/L"],
      Self::OxygenSaturation => &["%"],
      Self::Steps => &["steps"],
      Self::Distance => &["m", "km", "mi"],
      Self::CaloriesBurned => &["kcal", "cal"],
    }
  }

  fn standard_range(self) -> ValueRange {
    let (min, max) = match self {
      Self::HeartRate => (20.0, 250.0),
      Self::BloodPressureSystolic => (50.0, 250.0),
      Self::BloodPressureDiastolic => (30.0, 150.0),
      Self::BodyWeight => (0.1, 500.0),
      // °C
      Self::BodyTemperature => (25.0, 45.0),
      // mg/dL
      Self::BloodGlucose => (20.0, 600.0),
      Self::OxygenSaturation => (50.0, 100.0),
      Self::Steps => (0.0, 100_000.0),
      // metres
      Self::Distance => (0.0, 1_000_000.0),
      Self::CaloriesBurned => (0.0, 10_000.0),
    };
    ValueRange { min, max }
  }
}

// ─── Ranges ──────────────────────────────────────────────────────────────────

/// An inclusive `[min, max]` interval. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
  min: f64,
  max: f64,
}

impl ValueRange {
  pub fn new(min: f64, max: f64) -> Result<Self> {
    if min.is_nan() || max.is_nan() || min > max {
      return Err(Error::InvalidRange { min, max });
    }
    Ok(Self { min, max })
  }

  pub fn min(&self) -> f64 { self.min }

  pub fn max(&self) -> f64 { self.max }

  /// Both ends are inclusive; no tolerance is applied.
  pub fn contains(&self, value: f64) -> bool {
    self.min <= value && value <= self.max
  }
}

impl fmt::Display for ValueRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} to {}", number(&self.min), number(&self.max))
  }
}

/// Render a number the way clients have always seen it in messages: whole
/// values keep one decimal place (`300.0`), and magnitudes below `1e-4` or
/// from `1e16` up switch to a signed two-digit exponent (`1e+16`, `1e-07`).
pub(crate) fn number(value: &f64) -> String {
  if value.is_nan() {
    return "nan".to_string();
  }
  if value.is_infinite() {
    return if *value > 0.0 { "inf" } else { "-inf" }.to_string();
  }

  let scientific = format!("{value:e}");
  let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
  let exponent: i32 = exponent.parse().unwrap_or(0);

  if (-4..16).contains(&exponent) {
    let plain = value.to_string();
    if plain.contains('.') { plain } else { format!("{plain}.0") }
  } else {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
  }
}

// ─── Ruleset ─────────────────────────────────────────────────────────────────

/// Accepted units and plausible ranges for every [`MetricType`].
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct Ruleset {
  // Both indexed by the metric's declaration position.
  units:  Vec<&'static [&'static str]>,
  ranges: Vec<ValueRange>,
}

impl Ruleset {
  /// The built-in tables.
  pub fn standard() -> Self {
    Self {
      units:  MetricType::iter().map(MetricType::standard_units).collect(),
      ranges: MetricType::iter().map(MetricType::standard_range).collect(),
    }
  }

  /// Replace the plausible range for one metric.
  pub fn with_range(mut self, metric: MetricType, range: ValueRange) -> Self {
    self.ranges[metric as usize] = range;
    self
  }

  /// Accepted unit strings, in declared order.
  pub fn units(&self, metric: MetricType) -> &[&'static str] {
    self.units[metric as usize]
  }

  pub fn range(&self, metric: MetricType) -> ValueRange {
    self.ranges[metric as usize]
  }
}

impl Default for Ruleset {
  fn default() -> Self { Self::standard() }
}

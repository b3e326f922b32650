//! HTTP surface for HealthSync.
//!
//! Exposes an axum [`Router`] that authenticates bulk measurement
//! submissions with bearer tokens and reports per-item outcomes, backed by
//! any [`MeasurementStore`].

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::{ApiError, ConfigError};

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use healthsync_core::{
  metric::{MetricType, Ruleset, ValueRange},
  store::MeasurementStore,
};
use healthsync_token::{DEVELOPMENT_SECRET, TokenCodec, TokenConfig};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handlers::{health, measurements};

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "healthsync-api";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Output format of the log subscriber.
#[derive(Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
  #[default]
  Pretty,
  Json,
}

/// Replacement plausible range for one metric, e.g.
/// `[ranges.heart_rate]` with `min = 30` and `max = 220`.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RangeOverride {
  pub min: f64,
  pub max: f64,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `HEALTHSYNC_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                        String,
  pub port:                        u16,
  pub secret_key:                  String,
  pub algorithm:                   String,
  pub access_token_expire_minutes: i64,
  #[serde(default)]
  pub log_format:                  LogFormat,
  /// Per-metric range overrides, keyed by metric type name.
  #[serde(default)]
  pub ranges:                      BTreeMap<String, RangeOverride>,
}

impl ServerConfig {
  pub fn token_config(&self) -> TokenConfig {
    TokenConfig {
      secret:      self.secret_key.clone(),
      algorithm:   self.algorithm.clone(),
      ttl_minutes: self.access_token_expire_minutes,
    }
  }

  pub fn uses_development_secret(&self) -> bool {
    self.secret_key == DEVELOPMENT_SECRET
  }

  /// The standard ruleset with any configured range overrides applied.
  pub fn ruleset(&self) -> Result<Ruleset, ConfigError> {
    self.ranges.iter().try_fold(Ruleset::standard(), |rules, (name, bounds)| {
      let metric: MetricType = name
        .parse()
        .map_err(|_| ConfigError::UnknownMetric(name.clone()))?;
      let range = ValueRange::new(bounds.min, bounds.max)
        .map_err(|source| ConfigError::Range { metric, source })?;
      Ok(rules.with_range(metric, range))
    })
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    let token = TokenConfig::default();
    Self {
      host:                        "127.0.0.1".to_string(),
      port:                        8000,
      secret_key:                  token.secret,
      algorithm:                   token.algorithm,
      access_token_expire_minutes: token.ttl_minutes,
      log_format:                  LogFormat::default(),
      ranges:                      BTreeMap::new(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. Everything in it is
/// read-only after startup.
#[derive(Clone)]
pub struct AppState<S: MeasurementStore> {
  pub store: Arc<S>,
  pub rules: Arc<Ruleset>,
  pub codec: Arc<TokenCodec>,
}

impl<S: MeasurementStore> AppState<S> {
  /// Build state from configuration; fails if the signing settings or the
  /// range overrides are unusable.
  pub fn new(store: S, config: &ServerConfig) -> Result<Self, ConfigError> {
    let codec = TokenCodec::new(&config.token_config())?;
    Ok(Self {
      store: Arc::new(store),
      rules: Arc::new(config.ruleset()?),
      codec: Arc::new(codec),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MeasurementStore + Clone + 'static,
{
  Router::new()
    .route("/health", get(health::handler))
    .route("/v1/measurements/bulk", post(measurements::create_bulk::<S>))
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}


// ─── Integration tests ────────────────────────────────────────────────────────

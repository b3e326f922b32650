//! The `MeasurementStore` trait: where accepted measurements go.
//!
//! Durable storage is an external concern. The service only needs something
//! that turns a [`Measurement`] into an [`AcceptedRecord`] with an id.
//! [`EphemeralStore`] is the default and keeps nothing.

use std::{convert::Infallible, future::Future};

use chrono::Utc;
use uuid::Uuid;

use crate::measurement::{AcceptedRecord, Measurement};

/// Abstraction over a measurement persistence backend.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait MeasurementStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `measurement` and return it with its assigned id. The
  /// `created_at` timestamp is set by the store.
  fn save(
    &self,
    measurement: Measurement,
  ) -> impl Future<Output = Result<AcceptedRecord, Self::Error>> + Send + '_;
}

/// Assigns a fresh UUIDv4 and the current time, and stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralStore;

impl MeasurementStore for EphemeralStore {
  type Error = Infallible;

  async fn save(&self, measurement: Measurement) -> Result<AcceptedRecord, Self::Error> {
    Ok(AcceptedRecord {
      id: Uuid::new_v4(),
      measurement,
      created_at: Utc::now(),
    })
  }
}

//! The authenticated caller, as named by a verified token.

use serde::{Deserialize, Serialize};

/// Who is making the request. Built fresh from token claims on every request
/// and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub subject: String,
  pub email:   Option<String>,
}

impl Identity {
  pub fn new(subject: impl Into<String>) -> Self {
    Self { subject: subject.into(), email: None }
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }
}

//! Error taxonomy shared by queries, mutations and the HTTP adapter.

use std::fmt;
use thiserror::Error;

/// Why a fetch or write did not produce data.
///
/// Errors are stored in cache entries and handed to every observer, so they
/// are cheap to clone and carry messages rather than source errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
  /// Transport failure with no response (DNS, refused connection, timeout)
  #[error("network error: {0}")]
  Network(String),

  /// The server answered with a non-2xx status
  #[error("request failed with status {status}: {message}")]
  HttpStatus { status: u16, message: String },

  /// The response body was not the expected JSON shape
  #[error("failed to decode response: {0}")]
  Decode(String),

  /// Input rejected before any request was made
  #[error("{0}")]
  Validation(ValidationErrors),

  /// Internal cache invariant violated. Never a user error.
  #[error("cache consistency violated for {key}: {reason}")]
  CacheConsistency { key: String, reason: String },
}

impl FetchError {
  /// HTTP status code, if the server responded at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      FetchError::HttpStatus { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn is_network(&self) -> bool {
    matches!(self, FetchError::Network(_))
  }
}

impl From<ValidationErrors> for FetchError {
  fn from(errors: ValidationErrors) -> Self {
    FetchError::Validation(errors)
  }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub field: &'static str,
  pub message: String,
}

/// All validation failures for one input, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
  errors: Vec<FieldError>,
}

impl ValidationErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
    self.errors.push(FieldError {
      field,
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn len(&self) -> usize {
    self.errors.len()
  }

  /// First message recorded for `field`.
  pub fn for_field(&self, field: &str) -> Option<&str> {
    self
      .errors
      .iter()
      .find(|e| e.field == field)
      .map(|e| e.message.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
    self.errors.iter()
  }

  /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
  pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
    if self.is_empty() {
      Ok(value)
    } else {
      Err(self)
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
    write!(f, "{}", messages.join("; "))
  }
}

impl std::error::Error for ValidationErrors {}

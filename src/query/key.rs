//! Structural resource keys and key filters.

use sha2::{Digest, Sha256};
use std::fmt;

/// A single component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  Str(String),
  Int(i64),
  Bool(bool),
}

impl From<&str> for KeyPart {
  fn from(value: &str) -> Self {
    KeyPart::Str(value.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(value: String) -> Self {
    KeyPart::Str(value)
  }
}

impl From<i64> for KeyPart {
  fn from(value: i64) -> Self {
    KeyPart::Int(value)
  }
}

impl From<u32> for KeyPart {
  fn from(value: u32) -> Self {
    KeyPart::Int(i64::from(value))
  }
}

impl From<bool> for KeyPart {
  fn from(value: bool) -> Self {
    KeyPart::Bool(value)
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      // Quote strings so ["1"] and [1] never render the same
      KeyPart::Str(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
      KeyPart::Int(n) => write!(f, "{}", n),
      KeyPart::Bool(b) => write!(f, "{}", b),
    }
  }
}

/// Identifies a cached remote resource together with its variant parameters,
/// e.g. `["products", "price-low"]`.
///
/// Equality and hashing are by value, so two keys built separately from the
/// same parts address the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
  /// Build a key from homogeneous parts. Use [`QueryKey::with`] to append
  /// parts of other types.
  pub fn new<I, P>(parts: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<KeyPart>,
  {
    Self(parts.into_iter().map(Into::into).collect())
  }

  /// Append a part, returning the extended key.
  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.0.push(part.into());
    self
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.0
  }

  /// True when `prefix`'s parts are the leading parts of this key.
  /// Every key starts with itself and with the empty key.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }

  /// Stable SHA-256 fingerprint of the canonical form, for logs and
  /// correlating in-flight requests.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.to_string().as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, part) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, ",")?;
      }
      write!(f, "{}", part)?;
    }
    write!(f, "]")
  }
}

/// Selects cache entries for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
  /// Only the entry with exactly this key
  Exact(QueryKey),
  /// Every entry whose key starts with this key
  Prefix(QueryKey),
}

impl QueryFilter {
  pub fn matches(&self, key: &QueryKey) -> bool {
    match self {
      QueryFilter::Exact(k) => k == key,
      QueryFilter::Prefix(prefix) => key.starts_with(prefix),
    }
  }
}

impl From<QueryKey> for QueryFilter {
  fn from(key: QueryKey) -> Self {
    QueryFilter::Prefix(key)
  }
}

//! Typed handles that consumers hold while observing a key.

use chrono::{DateTime, Utc};
use std::marker::PhantomData;
use std::sync::Arc;

use super::cache::Subscription;
use super::entry::QueryStatus;
use super::error::FetchError;
use super::key::QueryKey;

/// What a view renders for one key at one instant.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
  pub data: Option<Arc<T>>,
  pub status: QueryStatus,
  pub error: Option<FetchError>,
  /// A request or retry is outstanding (including background refetches)
  pub is_fetching: bool,
  pub is_stale: bool,
  pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QuerySnapshot<T> {
  /// Nothing to show yet: first load in progress.
  pub fn is_loading(&self) -> bool {
    self.data.is_none() && matches!(self.status, QueryStatus::Idle | QueryStatus::Loading)
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  /// Snapshot for a key the cache no longer holds.
  pub(crate) fn empty() -> Self {
    Self {
      data: None,
      status: QueryStatus::Idle,
      error: None,
      is_fetching: false,
      is_stale: true,
      updated_at: None,
    }
  }
}

/// A live subscription to a key, typed by the value its fetcher produces.
///
/// Returned by [`QueryClient::subscribe`](super::QueryClient::subscribe) and
/// given back to [`QueryClient::unsubscribe`](super::QueryClient::unsubscribe).
#[derive(Debug)]
pub struct QueryObserver<T> {
  pub(crate) subscription: Subscription,
  _marker: PhantomData<fn() -> T>,
}

impl<T> QueryObserver<T> {
  pub(crate) fn new(subscription: Subscription) -> Self {
    Self {
      subscription,
      _marker: PhantomData,
    }
  }

  pub fn key(&self) -> &QueryKey {
    self.subscription.key()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_loading_only_without_data() {
    let mut snapshot: QuerySnapshot<u32> = QuerySnapshot::empty();
    assert!(snapshot.is_loading());

    snapshot.status = QueryStatus::Loading;
    assert!(snapshot.is_loading());

    snapshot.data = Some(Arc::new(5));
    assert!(!snapshot.is_loading());
  }

  #[test]
  fn test_error_with_data_is_not_loading() {
    let snapshot = QuerySnapshot {
      data: Some(Arc::new(5u32)),
      status: QueryStatus::Error,
      error: Some(FetchError::Network("down".into())),
      is_fetching: false,
      is_stale: true,
      updated_at: None,
    };
    assert!(snapshot.is_error());
    assert!(!snapshot.is_loading());
    assert!(!snapshot.is_success());
  }
}

//! The per-key cache record and its state transitions.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use tokio::time::Instant;

use super::error::FetchError;
use super::key::QueryKey;
use super::observer::QuerySnapshot;
use super::options::QueryOptions;

/// Type-erased cached value. Observers downcast it back to their `T`.
pub type QueryData = Arc<dyn Any + Send + Sync>;

/// Callback invoked synchronously after every transition of an entry.
pub type Listener = Box<dyn FnMut(&QueryEntry) + Send>;

/// Lifecycle of the data held by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Created but never fetched
  Idle,
  /// First fetch in progress, no data yet
  Loading,
  /// Holds data from the last successful fetch
  Success,
  /// Last fetch failed; earlier data, if any, is kept
  Error,
}

/// Identifies one fetch so late results from superseded requests can be
/// recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub struct QueryEntry {
  key: QueryKey,
  data: Option<QueryData>,
  status: QueryStatus,
  error: Option<FetchError>,
  last_fetched_at: Option<Instant>,
  data_updated_at: Option<DateTime<Utc>>,
  invalidated: bool,
  in_flight: Option<FetchId>,
  failure_count: u32,
  pub(crate) retry_at: Option<Instant>,
  pub(crate) next_interval_at: Option<Instant>,
  pub(crate) gc_at: Option<Instant>,
  pub(crate) options: QueryOptions,
  subscriber_count: usize,
  pub(crate) listeners: Vec<(SubscriptionId, Listener)>,
}

impl QueryEntry {
  pub(crate) fn new(key: QueryKey, options: QueryOptions) -> Self {
    Self {
      key,
      data: None,
      status: QueryStatus::Idle,
      error: None,
      last_fetched_at: None,
      data_updated_at: None,
      invalidated: false,
      in_flight: None,
      failure_count: 0,
      retry_at: None,
      next_interval_at: None,
      gc_at: None,
      options,
      subscriber_count: 0,
      listeners: Vec::new(),
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn data(&self) -> Option<&QueryData> {
    self.data.as_ref()
  }

  /// The cached value as `T`, or `None` if absent or of another type.
  pub fn data_as<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
    self.data.clone().and_then(|d| d.downcast::<T>().ok())
  }

  pub fn status(&self) -> QueryStatus {
    self.status
  }

  pub fn error(&self) -> Option<&FetchError> {
    self.error.as_ref()
  }

  pub fn last_fetched_at(&self) -> Option<Instant> {
    self.last_fetched_at
  }

  /// Wall-clock time of the last successful fetch, for display.
  pub fn data_updated_at(&self) -> Option<DateTime<Utc>> {
    self.data_updated_at
  }

  pub fn options(&self) -> &QueryOptions {
    &self.options
  }

  pub fn subscriber_count(&self) -> usize {
    self.subscriber_count
  }

  pub fn failure_count(&self) -> u32 {
    self.failure_count
  }

  pub fn is_invalidated(&self) -> bool {
    self.invalidated
  }

  pub fn in_flight(&self) -> Option<FetchId> {
    self.in_flight
  }

  /// A request is outstanding or a retry is scheduled.
  pub fn is_fetching(&self) -> bool {
    self.in_flight.is_some() || self.retry_at.is_some()
  }

  /// Stale once `stale_time` has elapsed since the last successful fetch,
  /// when never fetched, or after invalidation.
  pub fn is_stale(&self, now: Instant) -> bool {
    if self.invalidated {
      return true;
    }
    match self.last_fetched_at {
      Some(at) => now.saturating_duration_since(at) >= self.options.stale_time,
      None => true,
    }
  }

  pub fn snapshot<T: Send + Sync + 'static>(&self, now: Instant) -> QuerySnapshot<T> {
    QuerySnapshot {
      data: self.data_as::<T>(),
      status: self.status,
      error: self.error.clone(),
      is_fetching: self.is_fetching(),
      is_stale: self.is_stale(now),
      updated_at: self.data_updated_at,
    }
  }

  // ---------------------------------------------------------------------------
  // Transitions. Only the cache applies these, one per upsert.
  // ---------------------------------------------------------------------------

  pub(crate) fn begin_fetch(&mut self, id: FetchId) {
    self.in_flight = Some(id);
    self.retry_at = None;
    if self.data.is_none() && self.status != QueryStatus::Error {
      self.status = QueryStatus::Loading;
    }
  }

  pub(crate) fn record_success(&mut self, data: QueryData, now: Instant) {
    self.data = Some(data);
    self.status = QueryStatus::Success;
    self.error = None;
    self.last_fetched_at = Some(now);
    self.data_updated_at = Some(Utc::now());
    self.invalidated = false;
    self.in_flight = None;
    self.retry_at = None;
    self.failure_count = 0;
    self.next_interval_at = self.options.refetch_interval.map(|interval| now + interval);
  }

  /// Count a failure. Returns the retry deadline if one was scheduled,
  /// otherwise the entry moves to `Error` keeping any earlier data.
  pub(crate) fn record_failure(&mut self, error: FetchError, now: Instant) -> Option<Instant> {
    self.in_flight = None;
    self.failure_count += 1;

    if self.options.retry.should_retry(self.failure_count) {
      let at = now + self.options.retry.delay_for(self.failure_count);
      self.retry_at = Some(at);
      return Some(at);
    }

    self.retry_at = None;
    self.status = QueryStatus::Error;
    self.error = Some(error);
    self.next_interval_at = self.options.refetch_interval.map(|interval| now + interval);
    None
  }

  /// Drop the outstanding request without recording a result.
  pub(crate) fn cancel_fetch(&mut self) {
    self.in_flight = None;
    self.retry_at = None;
    if self.status == QueryStatus::Loading {
      self.status = QueryStatus::Idle;
    }
  }

  /// Back to a never-fetched entry. Subscribers and options are kept.
  pub(crate) fn reset(&mut self) {
    self.cancel_fetch();
    self.data = None;
    self.status = QueryStatus::Idle;
    self.error = None;
    self.last_fetched_at = None;
    self.data_updated_at = None;
    self.invalidated = false;
    self.failure_count = 0;
    self.next_interval_at = None;
  }

  /// Latest observer's options win. Keeps the interval schedule in step.
  pub(crate) fn set_options(&mut self, options: QueryOptions) {
    match (options.refetch_interval, self.last_fetched_at) {
      (None, _) => self.next_interval_at = None,
      (Some(interval), Some(at)) if self.next_interval_at.is_none() => {
        self.next_interval_at = Some(at + interval);
      }
      _ => {}
    }
    self.options = options;
  }

  pub(crate) fn invalidate(&mut self) {
    self.invalidated = true;
  }

  pub(crate) fn set_subscriber_count(&mut self, count: usize) {
    self.subscriber_count = count;
  }

  pub(crate) fn check_invariants(&self) -> Result<(), FetchError> {
    let violation = match self.status {
      QueryStatus::Success if self.data.is_none() => Some("success without data"),
      QueryStatus::Success if self.error.is_some() => Some("success with an error recorded"),
      QueryStatus::Error if self.error.is_none() => Some("error status without an error"),
      _ => None,
    };

    match violation {
      Some(reason) => Err(FetchError::CacheConsistency {
        key: self.key.to_string(),
        reason: reason.to_string(),
      }),
      None => Ok(()),
    }
  }
}

impl std::fmt::Debug for QueryEntry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryEntry")
      .field("key", &self.key)
      .field("status", &self.status)
      .field("has_data", &self.data.is_some())
      .field("error", &self.error)
      .field("in_flight", &self.in_flight)
      .field("invalidated", &self.invalidated)
      .field("subscriber_count", &self.subscriber_count)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::options::RetryPolicy;
  use std::time::Duration;

  fn entry(options: QueryOptions) -> QueryEntry {
    QueryEntry::new(QueryKey::new(["counter"]), options)
  }

  fn data(n: u32) -> QueryData {
    Arc::new(n)
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_then_stale() {
    let mut e = entry(QueryOptions::default().with_stale_time(Duration::from_secs(10)));
    let start = Instant::now();
    assert!(e.is_stale(start));

    e.begin_fetch(FetchId(1));
    assert_eq!(e.status(), QueryStatus::Loading);
    e.record_success(data(5), start);

    assert!(!e.is_stale(start + Duration::from_secs(9)));
    assert!(e.is_stale(start + Duration::from_secs(10)));
    assert_eq!(e.data_as::<u32>().as_deref(), Some(&5));
    assert!(e.data_as::<String>().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_forces_staleness_and_keeps_data() {
    let mut e = entry(QueryOptions::default().with_stale_time(Duration::from_secs(60)));
    let now = Instant::now();
    e.record_success(data(1), now);
    e.invalidate();

    assert!(e.is_stale(now));
    assert!(e.data().is_some());

    e.record_success(data(2), now);
    assert!(!e.is_invalidated());
  }

  #[tokio::test(start_paused = true)]
  async fn test_failure_keeps_previous_data() {
    let mut e = entry(QueryOptions::default());
    let now = Instant::now();
    e.record_success(data(5), now);

    e.begin_fetch(FetchId(2));
    assert_eq!(e.status(), QueryStatus::Success);
    let retry = e.record_failure(
      FetchError::HttpStatus {
        status: 500,
        message: "boom".into(),
      },
      now,
    );

    assert!(retry.is_none());
    assert_eq!(e.status(), QueryStatus::Error);
    assert_eq!(e.error().and_then(FetchError::status), Some(500));
    assert_eq!(e.data_as::<u32>().as_deref(), Some(&5));
    assert!(e.check_invariants().is_ok());
  }

  #[tokio::test(start_paused = true)]
  async fn test_failure_schedules_retry_when_configured() {
    let mut e = entry(QueryOptions::default().with_retry(RetryPolicy::exponential(1)));
    let now = Instant::now();

    e.begin_fetch(FetchId(1));
    let retry = e.record_failure(FetchError::Network("refused".into()), now);
    assert_eq!(retry, Some(now + Duration::from_secs(1)));
    assert!(e.is_fetching());
    assert_eq!(e.status(), QueryStatus::Loading);

    e.begin_fetch(FetchId(2));
    assert!(e
      .record_failure(FetchError::Network("refused".into()), now)
      .is_none());
    assert_eq!(e.status(), QueryStatus::Error);
    assert_eq!(e.failure_count(), 2);
  }

  #[test]
  fn test_invariant_violation_detected() {
    let mut e = entry(QueryOptions::default());
    e.status = QueryStatus::Success;
    assert!(matches!(
      e.check_invariants(),
      Err(FetchError::CacheConsistency { .. })
    ));
  }
}

//! Per-key caching and refetch configuration.

use std::time::Duration;

/// Retry behaviour for failed fetches.
///
/// Delays grow exponentially from `base_delay` and are capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Retries allowed after the first failure. Zero disables retry.
  pub max_retries: u32,
  pub base_delay: Duration,
  pub max_delay: Duration,
}

impl RetryPolicy {
  pub fn never() -> Self {
    Self {
      max_retries: 0,
      base_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(30),
    }
  }

  /// 1s, 2s, 4s, ... capped at 30s.
  pub fn exponential(max_retries: u32) -> Self {
    Self {
      max_retries,
      ..Self::never()
    }
  }

  /// Whether a fetch that has now failed `failure_count` times in a row
  /// should be tried again.
  pub fn should_retry(&self, failure_count: u32) -> bool {
    failure_count >= 1 && failure_count <= self.max_retries
  }

  /// Delay before the retry that follows the `failure_count`-th failure.
  pub fn delay_for(&self, failure_count: u32) -> Duration {
    let exponent = failure_count.saturating_sub(1);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::never()
  }
}

/// Configuration recognised by the query controller for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
  /// How long fetched data counts as fresh
  pub stale_time: Duration,
  /// How long an unobserved entry survives before eviction
  pub gc_time: Duration,
  /// Periodic refetch while observed
  pub refetch_interval: Option<Duration>,
  pub refetch_on_window_focus: bool,
  pub refetch_on_reconnect: bool,
  /// Refetch stale data when a new observer subscribes
  pub refetch_on_mount: bool,
  pub retry: RetryPolicy,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::ZERO,
      gc_time: Duration::from_secs(5 * 60),
      refetch_interval: None,
      refetch_on_window_focus: true,
      refetch_on_reconnect: true,
      refetch_on_mount: true,
      retry: RetryPolicy::never(),
    }
  }
}

impl QueryOptions {
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn with_gc_time(mut self, duration: Duration) -> Self {
    self.gc_time = duration;
    self
  }

  pub fn with_refetch_interval(mut self, interval: Option<Duration>) -> Self {
    self.refetch_interval = interval;
    self
  }

  pub fn with_refetch_on_window_focus(mut self, enabled: bool) -> Self {
    self.refetch_on_window_focus = enabled;
    self
  }

  pub fn with_refetch_on_reconnect(mut self, enabled: bool) -> Self {
    self.refetch_on_reconnect = enabled;
    self
  }

  pub fn with_refetch_on_mount(mut self, enabled: bool) -> Self {
    self.refetch_on_mount = enabled;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let options = QueryOptions::default();
    assert_eq!(options.stale_time, Duration::ZERO);
    assert_eq!(options.gc_time, Duration::from_secs(300));
    assert_eq!(options.refetch_interval, None);
    assert!(options.refetch_on_window_focus);
    assert!(options.refetch_on_reconnect);
    assert!(options.refetch_on_mount);
    assert_eq!(options.retry.max_retries, 0);
  }

  #[test]
  fn test_never_retries() {
    let retry = RetryPolicy::never();
    assert!(!retry.should_retry(1));
  }

  #[test]
  fn test_retry_attempt_cap() {
    let retry = RetryPolicy::exponential(3);
    assert!(retry.should_retry(1));
    assert!(retry.should_retry(3));
    assert!(!retry.should_retry(4));
  }

  #[test]
  fn test_backoff_doubles_then_caps() {
    let retry = RetryPolicy::exponential(10);
    assert_eq!(retry.delay_for(1), Duration::from_secs(1));
    assert_eq!(retry.delay_for(2), Duration::from_secs(2));
    assert_eq!(retry.delay_for(3), Duration::from_secs(4));
    assert_eq!(retry.delay_for(5), Duration::from_secs(16));
    assert_eq!(retry.delay_for(6), Duration::from_secs(30));
    assert_eq!(retry.delay_for(40), Duration::from_secs(30));
  }
}

//! Query controller: decides when to serve cached data, when to fetch, and
//! applies fetch results to the cache.
//!
//! The client is owned by one event loop. Fetches run as spawned tasks and
//! report back over a channel; [`QueryClient::poll`] or
//! [`QueryClient::next_outcome`] applies each result as a single cache
//! transition on the owning loop, so the cache never needs a lock.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cache::QueryCache;
use super::entry::{FetchId, Listener, QueryData, QueryEntry};
use super::error::FetchError;
use super::key::{QueryFilter, QueryKey};
use super::observer::{QueryObserver, QuerySnapshot};
use super::options::QueryOptions;

type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<QueryData, FetchError>> + Send + Sync>;

/// Result of one spawned fetch, delivered back to the owning loop.
struct FetchOutcome {
  key: QueryKey,
  fetch_id: FetchId,
  result: Result<QueryData, FetchError>,
}

/// What asked for a staleness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
  Mount,
  WindowFocus,
  Reconnect,
  Interval,
}

pub struct QueryClient {
  cache: QueryCache,
  fetchers: HashMap<QueryKey, Fetcher>,
  tasks: HashMap<QueryKey, JoinHandle<()>>,
  tx: mpsc::UnboundedSender<FetchOutcome>,
  rx: mpsc::UnboundedReceiver<FetchOutcome>,
  next_fetch_id: u64,
  online: bool,
  focused: bool,
}

impl QueryClient {
  pub fn new() -> Self {
    Self::with_defaults(QueryOptions::default())
  }

  /// Create a client whose entries start with `defaults` until an observer
  /// supplies its own options.
  pub fn with_defaults(defaults: QueryOptions) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      cache: QueryCache::new(defaults),
      fetchers: HashMap::new(),
      tasks: HashMap::new(),
      tx,
      rx,
      next_fetch_id: 0,
      online: true,
      focused: true,
    }
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn is_online(&self) -> bool {
    self.online
  }

  /// Number of keys with a request in flight or a retry scheduled.
  pub fn fetching_count(&self) -> usize {
    self.cache.iter().filter(|e| e.is_fetching()).count()
  }

  /// Observe `key`, fetching with `fetcher` when there is no data or the
  /// data is stale.
  ///
  /// - no data: fetch now (shared with any fetch already in flight)
  /// - fresh data: served as is, no request
  /// - stale data: served as is, refetched in the background when
  ///   `refetch_on_mount` is set
  pub fn subscribe<T, F, Fut>(
    &mut self,
    key: QueryKey,
    options: QueryOptions,
    fetcher: F,
  ) -> QueryObserver<T>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    self.subscribe_inner(key, options, erase(fetcher), None)
  }

  /// Like [`subscribe`](Self::subscribe), also registering a listener that
  /// runs after every transition of the entry until unsubscribed.
  pub fn subscribe_with<T, F, Fut, L>(
    &mut self,
    key: QueryKey,
    options: QueryOptions,
    fetcher: F,
    listener: L,
  ) -> QueryObserver<T>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    L: FnMut(&QueryEntry) + Send + 'static,
  {
    self.subscribe_inner(key, options, erase(fetcher), Some(Box::new(listener)))
  }

  fn subscribe_inner<T>(
    &mut self,
    key: QueryKey,
    options: QueryOptions,
    fetcher: Fetcher,
    listener: Option<Listener>,
  ) -> QueryObserver<T> {
    self.fetchers.insert(key.clone(), fetcher);

    let had_data = self.cache.get(&key).is_some_and(|e| e.data().is_some());
    let subscription = self.cache.subscribe(&key, listener);
    if let Err(e) = self.cache.upsert(&key, |entry| entry.set_options(options)) {
      warn!(key = %key, error = %e, "failed to apply query options");
    }

    if had_data {
      self.run_trigger(&key, Trigger::Mount, Instant::now());
    } else {
      self.fetch_if_idle(&key);
    }

    QueryObserver::new(subscription)
  }

  /// Stop observing. A fetch already in flight still lands in the cache for
  /// other observers; this observer is just no longer notified.
  pub fn unsubscribe<T>(&mut self, observer: QueryObserver<T>) -> bool {
    self.cache.unsubscribe(observer.subscription, Instant::now())
  }

  /// Current state of an observed key.
  pub fn snapshot<T: Send + Sync + 'static>(&self, observer: &QueryObserver<T>) -> QuerySnapshot<T> {
    self.query_snapshot(observer.key())
  }

  pub fn query_snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QuerySnapshot<T> {
    self
      .cache
      .get(key)
      .map(|e| e.snapshot(Instant::now()))
      .unwrap_or_else(QuerySnapshot::empty)
  }

  /// Fetch `key` now regardless of staleness. An in-flight request for the
  /// key is superseded and its result discarded.
  ///
  /// Returns false if nothing has ever subscribed to `key`.
  pub fn refetch(&mut self, key: &QueryKey) -> bool {
    if !self.fetchers.contains_key(key) {
      return false;
    }
    info!(key = %key, "manual refetch");
    self.start_fetch(key)
  }

  /// Mark matching entries stale and refetch those that are being observed.
  /// Unobserved entries refetch on their next subscription.
  ///
  /// A request started before the call may not reflect the write that caused
  /// it, so it never completes an invalidated entry: observed keys supersede
  /// it, unobserved keys drop it and keep their data.
  pub fn invalidate(&mut self, filter: &QueryFilter) -> Vec<QueryKey> {
    let matched = self.cache.invalidate(filter);
    for key in &matched {
      let observed = self.cache.get(key).is_some_and(|e| e.subscriber_count() > 0);
      if observed {
        self.start_fetch(key);
      } else {
        self.cancel_fetch(key);
      }
    }
    matched
  }

  /// The terminal (window) regained focus.
  pub fn on_window_focus(&mut self) {
    self.focused = true;
    let now = Instant::now();
    for key in self.observed_keys() {
      self.run_trigger(&key, Trigger::WindowFocus, now);
    }
  }

  pub fn set_focused(&mut self, focused: bool) {
    if focused && !self.focused {
      self.on_window_focus();
    } else {
      self.focused = focused;
    }
  }

  /// Record connectivity. Going from offline to online re-checks every
  /// observed key with `refetch_on_reconnect`.
  pub fn set_online(&mut self, online: bool) {
    let was_online = self.online;
    self.online = online;

    if online && !was_online {
      info!("network reconnected");
      let now = Instant::now();
      for key in self.observed_keys() {
        self.run_trigger(&key, Trigger::Reconnect, now);
      }
    } else if !online && was_online {
      warn!("network connection lost");
    }
  }

  /// Drive time-based work: due retries, refetch intervals, and eviction of
  /// unobserved entries. Call regularly from the event loop.
  pub fn tick(&mut self) {
    let now = Instant::now();

    let due_retries: Vec<QueryKey> = self
      .cache
      .iter()
      .filter(|e| e.in_flight().is_none() && e.retry_at.is_some_and(|at| at <= now))
      .map(|e| e.key().clone())
      .collect();
    for key in due_retries {
      debug!(key = %key, "retrying failed fetch");
      self.start_fetch(&key);
    }

    let due_intervals: Vec<QueryKey> = self
      .cache
      .iter()
      .filter(|e| e.subscriber_count() > 0 && e.next_interval_at.is_some_and(|at| at <= now))
      .map(|e| e.key().clone())
      .collect();
    for key in due_intervals {
      let rescheduled = self.cache.upsert(&key, |e| {
        e.next_interval_at = e.options.refetch_interval.map(|interval| now + interval);
      });
      if rescheduled.is_ok() {
        self.run_trigger(&key, Trigger::Interval, now);
      }
    }

    for key in self.cache.collect_garbage(now) {
      self.fetchers.remove(&key);
      if let Some(task) = self.tasks.remove(&key) {
        task.abort();
      }
    }
  }

  /// Apply every fetch result that has already arrived.
  /// Returns true if any of them changed the cache.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(outcome) = self.rx.try_recv() {
      changed |= self.apply_outcome(outcome);
    }
    changed
  }

  /// Wait for the next fetch result and apply it. Returns false if the
  /// result was stale and discarded. Cancel-safe.
  pub async fn next_outcome(&mut self) -> bool {
    match self.rx.recv().await {
      Some(outcome) => self.apply_outcome(outcome),
      None => false,
    }
  }

  /// Forget `key` entirely, cancelling any request in flight.
  pub fn remove_key(&mut self, key: &QueryKey) -> bool {
    if let Some(task) = self.tasks.remove(key) {
      task.abort();
    }
    self.fetchers.remove(key);
    self.cache.remove(key).is_some()
  }

  /// Drop cached data for `key` as if it had never been fetched. An
  /// in-flight request is cancelled; an observed key fetches again at once.
  ///
  /// Returns false if the key is not cached.
  pub fn reset_key(&mut self, key: &QueryKey) -> bool {
    if !self.cache.contains(key) {
      return false;
    }
    if let Some(task) = self.tasks.remove(key) {
      task.abort();
    }
    if let Err(e) = self.cache.upsert(key, QueryEntry::reset) {
      warn!(key = %key, error = %e, "failed to reset query");
      return false;
    }
    info!(key = %key, "query reset");

    let observed = self.cache.get(key).is_some_and(|e| e.subscriber_count() > 0);
    if observed {
      self.start_fetch(key);
    }
    true
  }

  fn cancel_fetch(&mut self, key: &QueryKey) {
    let Some(task) = self.tasks.remove(key) else {
      return;
    };
    task.abort();
    debug!(key = %key, "cancelled fetch for invalidated query");
    if let Err(e) = self.cache.upsert(key, QueryEntry::cancel_fetch) {
      warn!(key = %key, error = %e, "failed to cancel fetch");
    }
  }

  fn observed_keys(&self) -> Vec<QueryKey> {
    self
      .cache
      .iter()
      .filter(|e| e.subscriber_count() > 0)
      .map(|e| e.key().clone())
      .collect()
  }

  /// Staleness decision shared by every automatic trigger. Never fetches
  /// fresh data and never starts a second request for a key.
  fn run_trigger(&mut self, key: &QueryKey, trigger: Trigger, now: Instant) -> bool {
    let Some(entry) = self.cache.get(key) else {
      return false;
    };

    let options = entry.options();
    let enabled = match trigger {
      Trigger::Mount => options.refetch_on_mount,
      Trigger::WindowFocus => options.refetch_on_window_focus,
      Trigger::Reconnect => options.refetch_on_reconnect,
      Trigger::Interval => options.refetch_interval.is_some(),
    };

    if !enabled || entry.is_fetching() || !entry.is_stale(now) {
      return false;
    }

    debug!(key = %key, trigger = ?trigger, "stale query, refetching in background");
    self.start_fetch(key)
  }

  fn fetch_if_idle(&mut self, key: &QueryKey) -> bool {
    if self.cache.get(key).is_some_and(|e| e.is_fetching()) {
      debug!(key = %key, "joining in-flight fetch");
      return false;
    }
    self.start_fetch(key)
  }

  fn start_fetch(&mut self, key: &QueryKey) -> bool {
    let Some(fetcher) = self.fetchers.get(key).cloned() else {
      warn!(key = %key, "no fetcher registered for query");
      return false;
    };

    if let Some(previous) = self.tasks.remove(key) {
      debug!(key = %key, "superseding in-flight fetch");
      previous.abort();
    }

    self.next_fetch_id += 1;
    let fetch_id = FetchId(self.next_fetch_id);
    if self
      .cache
      .upsert(key, |entry| entry.begin_fetch(fetch_id))
      .is_err()
    {
      return false;
    }

    debug!(
      key = %key,
      fingerprint = %key.fingerprint(),
      fetch_id = fetch_id.0,
      "fetch started"
    );

    let future = fetcher();
    let tx = self.tx.clone();
    let outcome_key = key.clone();
    let task = tokio::spawn(async move {
      let result = future.await;
      // The receiver lives as long as the client
      let _ = tx.send(FetchOutcome {
        key: outcome_key,
        fetch_id,
        result,
      });
    });
    self.tasks.insert(key.clone(), task);
    true
  }

  fn apply_outcome(&mut self, outcome: FetchOutcome) -> bool {
    let FetchOutcome {
      key,
      fetch_id,
      result,
    } = outcome;

    let current = self.cache.get(&key).and_then(QueryEntry::in_flight);
    if current != Some(fetch_id) {
      debug!(key = %key, fetch_id = fetch_id.0, "discarding superseded fetch result");
      return false;
    }
    self.tasks.remove(&key);

    let now = Instant::now();
    match result {
      Ok(data) => {
        if self
          .cache
          .upsert(&key, |entry| entry.record_success(data, now))
          .is_ok()
        {
          debug!(key = %key, fetch_id = fetch_id.0, "fetch succeeded");
        }
      }
      Err(error) => {
        let message = error.to_string();
        match self
          .cache
          .upsert(&key, move |entry| entry.record_failure(error, now))
        {
          Ok(Some(retry_at)) => {
            let delay = retry_at.saturating_duration_since(now);
            warn!(key = %key, error = %message, retry_in = ?delay, "fetch failed, will retry");
          }
          Ok(None) => warn!(key = %key, error = %message, "fetch failed"),
          Err(_) => {}
        }
      }
    }
    true
  }
}

impl Default for QueryClient {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for QueryClient {
  fn drop(&mut self) {
    for (_, task) in self.tasks.drain() {
      task.abort();
    }
  }
}

impl std::fmt::Debug for QueryClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryClient")
      .field("entries", &self.cache.len())
      .field("in_flight", &self.tasks.len())
      .field("online", &self.online)
      .field("focused", &self.focused)
      .finish_non_exhaustive()
  }
}

/// Box a typed fetcher so the cache can hold it without knowing `T`.
fn erase<T, F, Fut>(fetcher: F) -> Fetcher
where
  T: Send + Sync + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
  Arc::new(move || {
    fetcher()
      .map(|result| result.map(|data| Arc::new(data) as QueryData))
      .boxed()
  })
}

//! The query cache store: key to entry mapping with atomic transitions,
//! subscriber bookkeeping and garbage collection.

use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{error, info};

use super::entry::{Listener, QueryEntry, SubscriptionId};
use super::error::FetchError;
use super::key::{QueryFilter, QueryKey};
use super::options::QueryOptions;

/// Handle for one subscription. Consumed by [`QueryCache::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
  id: SubscriptionId,
  key: QueryKey,
}

impl Subscription {
  pub fn id(&self) -> SubscriptionId {
    self.id
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

/// Owns every cache entry. All reads and writes go through its methods;
/// each write is applied as one step followed by listener notification.
pub struct QueryCache {
  entries: HashMap<QueryKey, QueryEntry>,
  default_options: QueryOptions,
  next_subscription: u64,
}

impl QueryCache {
  pub fn new(default_options: QueryOptions) -> Self {
    Self {
      entries: HashMap::new(),
      default_options,
      next_subscription: 0,
    }
  }

  pub fn default_options(&self) -> &QueryOptions {
    &self.default_options
  }

  pub fn get(&self, key: &QueryKey) -> Option<&QueryEntry> {
    self.entries.get(key)
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
    self.entries.keys()
  }

  pub fn iter(&self) -> impl Iterator<Item = &QueryEntry> {
    self.entries.values()
  }

  /// Apply `mutate` to the entry for `key`, creating it if absent, then
  /// check the entry invariants and notify its listeners.
  pub fn upsert<R>(
    &mut self,
    key: &QueryKey,
    mutate: impl FnOnce(&mut QueryEntry) -> R,
  ) -> Result<R, FetchError> {
    let default_options = &self.default_options;
    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(|| QueryEntry::new(key.clone(), default_options.clone()));

    let result = mutate(entry);

    if let Err(e) = entry.check_invariants() {
      error!(key = %key, error = %e, "cache transition broke an entry invariant");
      return Err(e);
    }

    notify(entry);
    Ok(result)
  }

  /// Register an observer of `key`, creating the entry if needed. Cancels
  /// any pending garbage collection for it.
  pub fn subscribe(&mut self, key: &QueryKey, listener: Option<Listener>) -> Subscription {
    self.next_subscription += 1;
    let id = SubscriptionId(self.next_subscription);

    let default_options = &self.default_options;
    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(|| QueryEntry::new(key.clone(), default_options.clone()));

    entry
      .listeners
      .push((id, listener.unwrap_or_else(|| Box::new(|_: &QueryEntry| {}))));
    entry.set_subscriber_count(entry.listeners.len());
    entry.gc_at = None;

    Subscription {
      id,
      key: key.clone(),
    }
  }

  /// Remove an observer. When the last one leaves, the entry becomes
  /// eligible for eviction after its `gc_time`.
  ///
  /// Returns false if the subscription was unknown (e.g. already evicted).
  pub fn unsubscribe(&mut self, subscription: Subscription, now: Instant) -> bool {
    let Some(entry) = self.entries.get_mut(&subscription.key) else {
      return false;
    };

    let before = entry.listeners.len();
    entry.listeners.retain(|(id, _)| *id != subscription.id);
    if entry.listeners.len() == before {
      return false;
    }

    entry.set_subscriber_count(entry.listeners.len());
    if entry.subscriber_count() == 0 {
      entry.gc_at = Some(now + entry.options.gc_time);
    }
    true
  }

  /// Mark every matching entry stale without discarding its data.
  /// Returns the keys that matched.
  pub fn invalidate(&mut self, filter: &QueryFilter) -> Vec<QueryKey> {
    let mut matched = Vec::new();
    for (key, entry) in self.entries.iter_mut() {
      if filter.matches(key) {
        entry.invalidate();
        notify(entry);
        matched.push(key.clone());
      }
    }
    if !matched.is_empty() {
      info!(count = matched.len(), filter = ?filter, "invalidated queries");
    }
    matched
  }

  /// Evict unobserved entries whose GC window has elapsed.
  pub fn collect_garbage(&mut self, now: Instant) -> Vec<QueryKey> {
    let expired: Vec<QueryKey> = self
      .entries
      .iter()
      .filter(|(_, e)| e.subscriber_count() == 0 && e.gc_at.is_some_and(|at| at <= now))
      .map(|(k, _)| k.clone())
      .collect();

    for key in &expired {
      self.entries.remove(key);
      info!(key = %key, "evicted unused query");
    }
    expired
  }

  pub fn remove(&mut self, key: &QueryKey) -> Option<QueryEntry> {
    self.entries.remove(key)
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new(QueryOptions::default())
  }
}

/// Invoke each listener with the entry's new state.
fn notify(entry: &mut QueryEntry) {
  let mut listeners = std::mem::take(&mut entry.listeners);
  for (_, listener) in listeners.iter_mut() {
    listener(entry);
  }
  entry.listeners = listeners;
}

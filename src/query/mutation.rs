//! Mutation controller: runs a write and invalidates cache keys on success.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::client::QueryClient;
use super::error::{FetchError, ValidationErrors};
use super::key::QueryFilter;

/// The state of the most recently settled write
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  /// Nothing submitted yet (or reset)
  Idle,
  /// A write is in progress
  Pending,
  /// The server accepted the write and returned this entity
  Success(Arc<T>),
  /// The write failed or its input was rejected; the cache was not touched
  Error(FetchError),
}

/// A write operation bound to the queries it makes stale.
///
/// Each call to [`mutate`](Self::mutate) runs independently; several writes
/// may be pending at once and each one that succeeds invalidates the
/// configured keys.
pub struct Mutation<T> {
  state: MutationState<T>,
  invalidates: Vec<QueryFilter>,
  pending: Vec<oneshot::Receiver<Result<T, FetchError>>>,
}

impl<T: Send + Sync + 'static> Mutation<T> {
  pub fn new(invalidates: Vec<QueryFilter>) -> Self {
    Self {
      state: MutationState::Idle,
      invalidates,
      pending: Vec::new(),
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    !self.pending.is_empty() || matches!(self.state, MutationState::Pending)
  }

  pub fn data(&self) -> Option<&Arc<T>> {
    match &self.state {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&FetchError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Forget the last result. Writes still in flight are kept.
  pub fn reset(&mut self) {
    self.state = if self.pending.is_empty() {
      MutationState::Idle
    } else {
      MutationState::Pending
    };
  }

  /// Start a write in the background. Call [`poll`](Self::poll) from the
  /// event loop to pick up its result.
  pub fn mutate<Fut>(&mut self, write: Fut)
  where
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(write.await);
    });
    self.pending.push(rx);
    self.state = MutationState::Pending;
  }

  /// Start a write only if `input` passed validation. A rejected input
  /// becomes a `Validation` error and no request is made.
  pub fn mutate_validated<V, F, Fut>(
    &mut self,
    input: Result<V, ValidationErrors>,
    write: F,
  ) -> bool
  where
    F: FnOnce(V) -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    match input {
      Ok(valid) => {
        self.mutate(write(valid));
        true
      }
      Err(errors) => {
        info!(errors = errors.len(), "write blocked by validation");
        self.state = MutationState::Error(FetchError::Validation(errors));
        false
      }
    }
  }

  /// Apply any writes that have finished. Returns true if the state changed.
  pub fn poll(&mut self, client: &mut QueryClient) -> bool {
    let mut changed = false;
    let mut still_pending = Vec::new();

    for mut rx in std::mem::take(&mut self.pending) {
      match rx.try_recv() {
        Ok(result) => {
          let _ = self.settle(result, client);
          changed = true;
        }
        Err(oneshot::error::TryRecvError::Empty) => still_pending.push(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.state = MutationState::Error(FetchError::Network("write was cancelled".to_string()));
          changed = true;
        }
      }
    }

    self.pending = still_pending;
    changed
  }

  /// Wait for every pending write and apply it.
  pub async fn wait(&mut self, client: &mut QueryClient) {
    for rx in std::mem::take(&mut self.pending) {
      let result = rx
        .await
        .unwrap_or_else(|_| Err(FetchError::Network("write was cancelled".to_string())));
      let _ = self.settle(result, client);
    }
  }

  /// Run a write to completion on the caller's task.
  pub async fn run<Fut>(&mut self, client: &mut QueryClient, write: Fut) -> Result<Arc<T>, FetchError>
  where
    Fut: Future<Output = Result<T, FetchError>>,
  {
    self.state = MutationState::Pending;
    let result = write.await;
    self.settle(result, client)
  }

  /// Record the result, then invalidate on success. Failures leave the
  /// cache untouched.
  fn settle(&mut self, result: Result<T, FetchError>, client: &mut QueryClient) -> Result<Arc<T>, FetchError> {
    match result {
      Ok(data) => {
        let data = Arc::new(data);
        self.state = MutationState::Success(data.clone());
        for filter in &self.invalidates {
          client.invalidate(filter);
        }
        Ok(data)
      }
      Err(error) => {
        warn!(error = %error, "write failed");
        self.state = MutationState::Error(error.clone());
        Err(error)
      }
    }
  }
}

impl<T> std::fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("invalidates", &self.invalidates)
      .field("pending", &self.pending.len())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::key::QueryKey;
  use crate::query::options::QueryOptions;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;
  use std::time::Duration;

  fn products_key() -> QueryKey {
    QueryKey::new(["products", "default"])
  }

  fn products_filter() -> QueryFilter {
    QueryFilter::Prefix(QueryKey::new(["products"]))
  }

  /// A fake server holding product titles, with a fetch counter.
  #[derive(Clone, Default)]
  struct Server {
    titles: Arc<Mutex<Vec<String>>>,
    fetches: Arc<AtomicUsize>,
  }

  impl Server {
    fn fetcher(&self) -> impl Fn() -> futures::future::Ready<Result<Vec<String>, FetchError>> + Send + Sync + 'static {
      let server = self.clone();
      move || {
        server.fetches.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(server.titles.lock().unwrap().clone()))
      }
    }

    fn add(&self, title: &str) -> impl Future<Output = Result<String, FetchError>> + Send + 'static {
      let titles = self.titles.clone();
      let title = title.to_string();
      async move {
        titles.lock().unwrap().push(title.clone());
        Ok(title)
      }
    }

    fn fetches(&self) -> usize {
      self.fetches.load(Ordering::SeqCst)
    }
  }

  fn options() -> QueryOptions {
    QueryOptions::default().with_stale_time(Duration::from_secs(60))
  }

  #[tokio::test(start_paused = true)]
  async fn test_successful_write_refetches_observed_list() {
    let server = Server::default();
    server.titles.lock().unwrap().push("Backpack".to_string());

    let mut client = QueryClient::new();
    let observer = client.subscribe(products_key(), options(), server.fetcher());
    client.next_outcome().await;
    assert_eq!(server.fetches(), 1);

    let mut mutation = Mutation::new(vec![products_filter()]);
    let created = mutation
      .run(&mut client, server.add("Rain Jacket"))
      .await
      .unwrap();
    assert_eq!(created.as_str(), "Rain Jacket");
    assert_eq!(server.fetches(), 2);

    client.next_outcome().await;
    let titles = client.snapshot(&observer).data.unwrap();
    assert_eq!(titles.as_slice(), ["Backpack", "Rain Jacket"]);
    assert!(matches!(mutation.state(), MutationState::Success(_)));
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_write_leaves_cache_untouched() {
    let server = Server::default();
    let mut client = QueryClient::new();
    let _observer = client.subscribe(products_key(), options(), server.fetcher());
    client.next_outcome().await;

    let mut mutation: Mutation<String> = Mutation::new(vec![products_filter()]);
    let result = mutation
      .run(&mut client, async {
        Err(FetchError::HttpStatus {
          status: 503,
          message: "Service Unavailable".to_string(),
        })
      })
      .await;

    assert_eq!(result.unwrap_err().status(), Some(503));
    assert_eq!(mutation.error().and_then(FetchError::status), Some(503));
    assert_eq!(server.fetches(), 1);
    assert!(!client.cache().get(&products_key()).unwrap().is_invalidated());
  }

  #[tokio::test(start_paused = true)]
  async fn test_validation_failure_never_fires_write() {
    let mut client = QueryClient::new();
    let writes = Arc::new(AtomicUsize::new(0));
    let writes_clone = writes.clone();
    let mut mutation: Mutation<String> = Mutation::new(vec![products_filter()]);

    let mut errors = ValidationErrors::new();
    errors.add("title", "Title is required");

    let fired = mutation.mutate_validated(Err::<String, _>(errors), move |title| {
      writes_clone.fetch_add(1, Ordering::SeqCst);
      async move { Ok(title) }
    });

    assert!(!fired);
    assert!(!mutation.is_pending());
    assert!(matches!(mutation.error(), Some(FetchError::Validation(_))));
    assert!(!mutation.poll(&mut client));
    assert_eq!(writes.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_background_writes_settle_through_poll() {
    let server = Server::default();
    let mut client = QueryClient::new();
    let _observer = client.subscribe(products_key(), options(), server.fetcher());
    client.next_outcome().await;

    let mut mutation = Mutation::new(vec![products_filter()]);
    mutation.mutate(server.add("Ring"));
    mutation.mutate(server.add("Monitor"));
    assert!(mutation.is_pending());

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(mutation.poll(&mut client));
    assert!(!mutation.is_pending());
    assert!(mutation.data().is_some());

    // Each write invalidated; the second superseded the first refetch
    assert_eq!(server.fetches(), 3);
    while client.poll() {}
    tokio::time::sleep(Duration::from_millis(1)).await;
    client.poll();
    let snapshot = client.query_snapshot::<Vec<String>>(&products_key());
    assert_eq!(snapshot.data.unwrap().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_wait_and_reset() {
    let server = Server::default();
    let mut client = QueryClient::new();
    let mut mutation = Mutation::new(vec![products_filter()]);

    mutation.mutate(server.add("Hat"));
    mutation.wait(&mut client).await;
    assert_eq!(mutation.data().map(|d| d.as_str()), Some("Hat"));

    mutation.reset();
    assert!(matches!(mutation.state(), MutationState::Idle));
  }
}

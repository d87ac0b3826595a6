//! Remote-resource query cache with stale-while-revalidate semantics.
//!
//! Modelled on TanStack Query:
//! - a [`QueryCache`] holds one [`QueryEntry`] per [`QueryKey`]
//! - a [`QueryClient`] decides when to serve cached data and when to fetch,
//!   de-duplicating requests per key and refetching on focus, reconnect,
//!   interval and mount
//! - a [`Mutation`] performs writes and invalidates the keys they affect
//!
//! # Example
//!
//! ```ignore
//! let mut client = QueryClient::new();
//! let observer = client.subscribe(
//!   QueryKey::new(["products", "default"]),
//!   QueryOptions::default().with_stale_time(Duration::from_secs(10)),
//!   move || {
//!     let shop = shop.clone();
//!     async move { shop.get_products(ProductSort::Default).await }
//!   },
//! );
//!
//! // In the event loop
//! client.poll();
//! let snapshot = client.snapshot(&observer);
//! ```

mod cache;
mod client;
mod entry;
mod error;
mod key;
mod mutation;
mod observer;
mod options;

pub use cache::{QueryCache, Subscription};
pub use client::QueryClient;
pub use entry::{FetchId, Listener, QueryData, QueryEntry, QueryStatus, SubscriptionId};
pub use error::{FetchError, FieldError, ValidationErrors};
pub use key::{KeyPart, QueryFilter, QueryKey};
pub use mutation::{Mutation, MutationState};
pub use observer::{QueryObserver, QuerySnapshot};
pub use options::{QueryOptions, RetryPolicy};

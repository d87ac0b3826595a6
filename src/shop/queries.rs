//! Query keys, options and client-side ordering for the store screens.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::query::{QueryFilter, QueryKey, QueryOptions};

use super::types::Product;

/// Product ordering offered by the products screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProductSort {
  /// Server order
  #[default]
  Default,
  PriceLow,
  PriceHigh,
  /// Title, A to Z
  Name,
  /// Rating, high to low
  Rating,
}

impl ProductSort {
  pub const ALL: [ProductSort; 5] = [
    ProductSort::Default,
    ProductSort::PriceLow,
    ProductSort::PriceHigh,
    ProductSort::Name,
    ProductSort::Rating,
  ];

  /// Wire value, also used as the key part
  pub fn as_str(&self) -> &'static str {
    match self {
      ProductSort::Default => "default",
      ProductSort::PriceLow => "price-low",
      ProductSort::PriceHigh => "price-high",
      ProductSort::Name => "name",
      ProductSort::Rating => "rating",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      ProductSort::Default => "Default",
      ProductSort::PriceLow => "Price: Low to High",
      ProductSort::PriceHigh => "Price: High to Low",
      ProductSort::Name => "Name: A to Z",
      ProductSort::Rating => "Rating: High to Low",
    }
  }

  /// Next mode in menu order, wrapping around
  pub fn next(&self) -> Self {
    let index = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
    Self::ALL[(index + 1) % Self::ALL.len()]
  }
}

impl fmt::Display for ProductSort {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for ProductSort {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .iter()
      .find(|sort| sort.as_str() == s.trim().to_lowercase())
      .copied()
      .ok_or_else(|| format!("unknown sort mode: {}", s))
  }
}

/// Order products in place for display.
pub fn sort_products(products: &mut [Product], sort: ProductSort) {
  match sort {
    ProductSort::Default => {}
    ProductSort::PriceLow => products.sort_by(|a, b| a.price.total_cmp(&b.price)),
    ProductSort::PriceHigh => products.sort_by(|a, b| b.price.total_cmp(&a.price)),
    ProductSort::Name => products.sort_by(|a, b| compare_titles(&a.title, &b.title)),
    ProductSort::Rating => products.sort_by(|a, b| b.rating.rate.total_cmp(&a.rating.rate)),
  }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
  a.to_lowercase()
    .cmp(&b.to_lowercase())
    .then_with(|| a.cmp(b))
}

// ============================================================================
// Keys
// ============================================================================

pub const PRODUCTS: &str = "products";
pub const USERS: &str = "users";

pub fn products_key(sort: ProductSort) -> QueryKey {
  QueryKey::new([PRODUCTS, sort.as_str()])
}

/// Every product listing regardless of sort
pub fn all_products() -> QueryFilter {
  QueryFilter::Prefix(QueryKey::new([PRODUCTS]))
}

pub fn users_key() -> QueryKey {
  QueryKey::new([USERS])
}

// ============================================================================
// Options
// ============================================================================

pub fn products_options() -> QueryOptions {
  QueryOptions::default()
    .with_stale_time(Duration::from_secs(10))
    .with_gc_time(Duration::from_secs(200))
    .with_refetch_interval(Some(Duration::from_secs(120)))
    .with_refetch_on_window_focus(true)
}

pub fn users_options() -> QueryOptions {
  QueryOptions::default()
    .with_stale_time(Duration::from_secs(100))
    .with_gc_time(Duration::from_secs(100))
    .with_refetch_interval(Some(Duration::from_secs(100)))
    .with_refetch_on_window_focus(true)
    .with_refetch_on_mount(true)
    .with_refetch_on_reconnect(true)
}

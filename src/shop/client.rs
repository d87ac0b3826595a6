use color_eyre::Result;
use std::time::Duration;
use tracing::debug;

use crate::http::HttpClient;
use crate::query::FetchError;

use super::queries::{sort_products, ProductSort};
use super::types::{NewProduct, Product, User, UsersResponse};

/// Typed client for the fake-store and random-user APIs
#[derive(Clone, Debug)]
pub struct StoreClient {
  products: HttpClient,
  users: HttpClient,
  user_count: u32,
}

impl StoreClient {
  pub fn new(
    products_url: &str,
    users_url: &str,
    user_count: u32,
    timeout: Duration,
  ) -> Result<Self> {
    Ok(Self {
      products: HttpClient::new(products_url, timeout)?,
      users: HttpClient::new(users_url, timeout)?,
      user_count,
    })
  }

  /// Products listing, ordered by `sort` on the client side.
  pub async fn get_products(&self, sort: ProductSort) -> Result<Vec<Product>, FetchError> {
    let mut products: Vec<Product> = self
      .products
      .get_json("products", &[("sort", sort.as_str().to_string())])
      .await?;
    sort_products(&mut products, sort);
    debug!(count = products.len(), sort = %sort, "fetched products");
    Ok(products)
  }

  pub async fn add_product(&self, product: &NewProduct) -> Result<Product, FetchError> {
    let created: Product = self.products.post_json("products", product).await?;
    debug!(id = created.id, title = %created.title, "created product");
    Ok(created)
  }

  pub async fn get_users(&self) -> Result<Vec<User>, FetchError> {
    let response: UsersResponse = self
      .users
      .get_json("", &[("results", self.user_count.to_string())])
      .await?;
    Ok(response.results)
  }

  /// The adapter whose host is probed for connectivity
  pub fn probe_target(&self) -> &HttpClient {
    &self.products
  }
}

mod add_product;
mod not_found;
mod products;
mod users;

pub use add_product::AddProductView;
pub use not_found::NotFoundView;
pub use products::ProductsView;
pub use users::UsersView;

use crate::query::QueryObserver;
use crate::shop::{products_key, users_key, Product, ProductSort, User};
use crate::ui::view::ViewContext;

pub(crate) fn subscribe_products(ctx: &mut ViewContext, sort: ProductSort) -> QueryObserver<Vec<Product>> {
  let store = ctx.store.clone();
  ctx.queries.subscribe(products_key(sort), ctx.presets.products.clone(), move || {
    let store = store.clone();
    async move { store.get_products(sort).await }
  })
}

pub(crate) fn subscribe_users(ctx: &mut ViewContext) -> QueryObserver<Vec<User>> {
  let store = ctx.store.clone();
  ctx.queries.subscribe(users_key(), ctx.presets.users.clone(), move || {
    let store = store.clone();
    async move { store.get_users().await }
  })
}

#[cfg(test)]
pub(crate) mod fixtures {
  use crate::config::{Config, QueryPresets};
  use crate::shop::StoreClient;
  use std::time::Duration;

  /// Store client aimed at a port nothing listens on
  pub fn offline_store() -> StoreClient {
    StoreClient::new("http://127.0.0.1:9", "http://127.0.0.1:9/api/", 3, Duration::from_secs(1)).unwrap()
  }

  pub fn presets() -> QueryPresets {
    Config::default().presets()
  }
}

//! Storefront domain: API types, the typed store client, query presets and
//! product form validation.

mod client;
mod queries;
mod types;
mod validation;

pub use client::StoreClient;
pub use queries::{
  all_products, products_key, products_options, sort_products, users_key, users_options,
  ProductSort, PRODUCTS, USERS,
};
pub use types::{NewProduct, Product, Rating, User, UserId, UserName};
pub use validation::{ProductForm, CATEGORIES};

//! Serde types for the fake-store and random-user APIs.

use serde::{Deserialize, Serialize};

/// Product rating summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  #[serde(default)]
  pub rate: f64,
  #[serde(default)]
  pub count: u32,
}

/// A product as returned by `GET /products`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub title: String,
  pub price: f64,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub image: String,
  // Not echoed back by POST /products
  #[serde(default)]
  pub rating: Rating,
}

/// A validated product ready to be sent with `POST /products`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
  pub title: String,
  pub price: f64,
  pub description: String,
  pub category: String,
  pub image: String,
}

// ============================================================================
// Random user API
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserName {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub first: String,
  #[serde(default)]
  pub last: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserId {
  #[serde(default)]
  pub name: String,
  pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
  #[serde(default)]
  pub name: UserName,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub id: UserId,
  #[serde(default)]
  pub phone: String,
}

impl User {
  pub fn display_name(&self) -> String {
    format!("{} {}", self.name.first, self.name.last)
      .trim()
      .to_string()
  }
}

/// Envelope of `GET /api/?results=n`
#[derive(Debug, Deserialize)]
pub struct UsersResponse {
  #[serde(default)]
  pub results: Vec<User>,
}

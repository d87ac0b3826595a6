//! Validation and normalisation of the add-product form.

use url::Url;

use crate::query::ValidationErrors;

use super::types::NewProduct;

pub const CATEGORIES: [&str; 4] = [
  "men's clothing",
  "women's clothing",
  "jewelery",
  "electronics",
];

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 100;
const DESCRIPTION_MIN: usize = 10;
const DESCRIPTION_MAX: usize = 1000;
const PRICE_MIN: f64 = 0.01;
const PRICE_MAX: f64 = 999_999.99;

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
  pub title: String,
  pub price: String,
  pub description: String,
  pub category: String,
  pub image: String,
}

impl ProductForm {
  /// Check every field and build the request payload. All failing fields
  /// are reported together.
  pub fn validate(&self) -> Result<NewProduct, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = self.title.trim();
    if title.is_empty() {
      errors.add("title", "Title is required");
    } else if title.chars().count() < TITLE_MIN {
      errors.add("title", "Title must be at least 3 characters");
    } else if title.chars().count() > TITLE_MAX {
      errors.add("title", "Title must be less than 100 characters");
    }

    let price = parse_price(&self.price, &mut errors);

    let description = self.description.trim();
    if description.is_empty() {
      errors.add("description", "Description is required");
    } else if description.chars().count() < DESCRIPTION_MIN {
      errors.add("description", "Description must be at least 10 characters");
    } else if description.chars().count() > DESCRIPTION_MAX {
      errors.add("description", "Description must be less than 1000 characters");
    }

    let category = self.category.trim().to_lowercase();
    if category.is_empty() {
      errors.add("category", "Category is required");
    } else if !CATEGORIES.contains(&category.as_str()) {
      errors.add("category", "Please select a valid category");
    }

    let image = self.image.trim();
    if image.is_empty() {
      errors.add("image", "Image URL is required");
    } else if !(image.starts_with("http://") || image.starts_with("https://")) {
      errors.add(
        "image",
        "Please enter a valid URL starting with http:// or https://",
      );
    } else if !is_valid_url(image) {
      errors.add("image", "Please enter a valid URL");
    }

    errors.into_result(NewProduct {
      title: title.to_string(),
      price: price.unwrap_or_default(),
      description: description.to_string(),
      category,
      image: image.to_string(),
    })
  }
}

fn parse_price(raw: &str, errors: &mut ValidationErrors) -> Option<f64> {
  let raw = raw.trim();
  if raw.is_empty() {
    errors.add("price", "Price is required");
    return None;
  }

  let price = match raw.parse::<f64>() {
    Ok(p) if p.is_finite() => p,
    _ => {
      errors.add("price", "Price must be a number");
      return None;
    }
  };

  if price < PRICE_MIN {
    errors.add("price", "Price must be greater than 0");
    None
  } else if price > PRICE_MAX {
    errors.add("price", "Price must be less than 1,000,000");
    None
  } else {
    Some((price * 100.0).round() / 100.0)
  }
}

fn is_valid_url(value: &str) -> bool {
  Url::parse(value).is_ok_and(|url| url.host_str().is_some_and(|h| !h.is_empty()))
}

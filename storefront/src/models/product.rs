// storefront/src/models/product.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

pub const MAX_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightOption {
  pub weight: String,
  pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub category: String,
  /// Base price in rupees.
  pub price: i64,
  pub weights: Vec<WeightOption>,
  pub images: Vec<String>,
  pub tags: Vec<String>,
  pub is_eggless: bool,
  pub is_available: bool,
  pub is_featured: bool,
  pub rating_average: f64,
  pub review_count: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Admin payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
  pub name: String,
  pub slug: Option<String>,
  pub description: Option<String>,
  pub category: String,
  pub price: i64,
  #[serde(default)]
  pub weights: Vec<WeightOption>,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub is_eggless: bool,
  #[serde(default = "default_true")]
  pub is_available: bool,
  #[serde(default)]
  pub is_featured: bool,
}

fn default_true() -> bool {
  true
}

/// Admin payload for a partial product update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
  pub name: Option<String>,
  pub description: Option<String>,
  pub category: Option<String>,
  pub price: Option<i64>,
  pub weights: Option<Vec<WeightOption>>,
  pub images: Option<Vec<String>>,
  pub tags: Option<Vec<String>>,
  pub is_eggless: Option<bool>,
  pub is_available: Option<bool>,
  pub is_featured: Option<bool>,
}

impl Product {
  pub fn create(new: NewProduct, now: DateTime<Utc>) -> Result<Self, AppError> {
    let name = new.name.trim().to_string();
    if name.is_empty() {
      return Err(AppError::Validation("Product name is required".to_string()));
    }
    if new.category.trim().is_empty() {
      return Err(AppError::Validation("Product category is required".to_string()));
    }
    validate_prices(new.price, &new.weights)?;
    let slug = match new.slug.as_deref().map(slugify).filter(|s| !s.is_empty()) {
      Some(slug) => slug,
      None => slugify(&name),
    };
    Ok(Self {
      id: Uuid::new_v4(),
      name,
      slug,
      description: new.description.filter(|d| !d.trim().is_empty()),
      category: new.category.trim().to_lowercase(),
      price: new.price,
      weights: new.weights,
      images: new.images,
      tags: new.tags.into_iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect(),
      is_eggless: new.is_eggless,
      is_available: new.is_available,
      is_featured: new.is_featured,
      rating_average: 0.0,
      review_count: 0,
      created_at: now,
      updated_at: now,
    })
  }

  pub fn apply_update(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> Result<(), AppError> {
    if let Some(name) = update.name {
      if name.trim().is_empty() {
        return Err(AppError::Validation("Product name is required".to_string()));
      }
      self.name = name.trim().to_string();
    }
    if let Some(description) = update.description {
      self.description = Some(description).filter(|d| !d.trim().is_empty());
    }
    if let Some(category) = update.category {
      self.category = category.trim().to_lowercase();
    }
    let price = update.price.unwrap_or(self.price);
    let weights = update.weights.unwrap_or_else(|| self.weights.clone());
    validate_prices(price, &weights)?;
    self.price = price;
    self.weights = weights;
    if let Some(images) = update.images {
      self.images = images;
    }
    if let Some(tags) = update.tags {
      self.tags = tags.into_iter().map(|t| t.trim().to_lowercase()).collect();
    }
    if let Some(v) = update.is_eggless {
      self.is_eggless = v;
    }
    if let Some(v) = update.is_available {
      self.is_available = v;
    }
    if let Some(v) = update.is_featured {
      self.is_featured = v;
    }
    self.updated_at = now;
    Ok(())
  }
}

fn validate_prices(price: i64, weights: &[WeightOption]) -> Result<(), AppError> {
  if price <= 0 || weights.iter().any(|w| w.price <= 0) {
    return Err(AppError::Validation("Prices must be greater than zero".to_string()));
  }
  Ok(())
}

/// `"Chocolate Truffle (1 kg)!"` -> `"chocolate-truffle-1-kg"`.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  for c in name.trim().chars() {
    if c.is_ascii_alphanumeric() {
      slug.push(c.to_ascii_lowercase());
    } else if !slug.ends_with('-') && !slug.is_empty() {
      slug.push('-');
    }
  }
  slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
  #[default]
  Newest,
  PriceAsc,
  PriceDesc,
  Rating,
}

/// Query string of the catalog listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
  pub category: Option<String>,
  pub search: Option<String>,
  pub eggless: Option<bool>,
  pub featured: Option<bool>,
  pub min_price: Option<i64>,
  pub max_price: Option<i64>,
  #[serde(default)]
  pub sort: ProductSort,
  pub page: Option<u32>,
  pub limit: Option<u32>,
}

impl ProductFilter {
  pub fn page(&self) -> u32 {
    self.page.unwrap_or(1).max(1)
  }

  pub fn limit(&self) -> u32 {
    self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> u32 {
    (self.page() - 1) * self.limit()
  }

  pub fn search_term(&self) -> Option<String> {
    self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
  }

  pub fn category_term(&self) -> Option<String> {
    self
      .category
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty() && *c != "all")
      .map(str::to_lowercase)
  }

  /// In-process form of the catalog query. Only available products are listed.
  pub fn matches(&self, product: &Product) -> bool {
    if !product.is_available {
      return false;
    }
    if let Some(category) = self.category_term() {
      if product.category != category {
        return false;
      }
    }
    if let Some(term) = self.search_term() {
      let in_name = product.name.to_lowercase().contains(&term);
      let in_description = product.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&term));
      let in_tags = product.tags.iter().any(|t| t.contains(&term));
      if !(in_name || in_description || in_tags) {
        return false;
      }
    }
    if self.eggless == Some(true) && !product.is_eggless {
      return false;
    }
    if self.featured == Some(true) && !product.is_featured {
      return false;
    }
    if self.min_price.is_some_and(|min| product.price < min) {
      return false;
    }
    if self.max_price.is_some_and(|max| product.price > max) {
      return false;
    }
    true
  }

  pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
    match self.sort {
      ProductSort::Newest => b.created_at.cmp(&a.created_at),
      ProductSort::PriceAsc => a.price.cmp(&b.price),
      ProductSort::PriceDesc => b.price.cmp(&a.price),
      ProductSort::Rating => b.rating_average.total_cmp(&a.rating_average),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
  pub products: Vec<Product>,
  pub total: i64,
  pub page: u32,
  pub limit: u32,
  pub total_pages: i64,
}

impl ProductPage {
  pub fn new(products: Vec<Product>, total: i64, filter: &ProductFilter) -> Self {
    let limit = filter.limit();
    Self {
      products,
      total,
      page: filter.page(),
      limit,
      total_pages: (total + i64::from(limit) - 1) / i64::from(limit),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cake(name: &str, price: i64) -> Product {
    Product::create(
      NewProduct {
        name: name.to_string(),
        slug: None,
        description: Some("Rich and moist".to_string()),
        category: "Cakes".to_string(),
        price,
        weights: vec![],
        images: vec![],
        tags: vec!["Chocolate".to_string()],
        is_eggless: false,
        is_available: true,
        is_featured: false,
      },
      Utc::now(),
    )
    .unwrap()
  }

  #[test]
  fn slugs_are_url_safe() {
    assert_eq!(slugify("Chocolate Truffle (1 kg)!"), "chocolate-truffle-1-kg");
    assert_eq!(slugify("  Red   Velvet "), "red-velvet");
  }

  #[test]
  fn limit_is_capped() {
    let filter = ProductFilter {
      limit: Some(500),
      page: Some(0),
      ..Default::default()
    };

    assert_eq!(filter.limit(), MAX_PAGE_SIZE);
    assert_eq!(filter.page(), 1);
    assert_eq!(filter.offset(), 0);
  }

  #[test]
  fn search_covers_tags_and_category_is_case_insensitive() {
    let product = cake("Truffle Delight", 750);
    let filter = ProductFilter {
      search: Some("CHOCO".to_string()),
      category: Some("cakes".to_string()),
      ..Default::default()
    };

    assert!(filter.matches(&product));
  }

  #[test]
  fn price_bounds_and_eggless_filter() {
    let product = cake("Truffle Delight", 750);

    let too_cheap = ProductFilter {
      max_price: Some(500),
      ..Default::default()
    };
    let eggless_only = ProductFilter {
      eggless: Some(true),
      ..Default::default()
    };

    assert!(!too_cheap.matches(&product));
    assert!(!eggless_only.matches(&product));
  }

  #[test]
  fn non_positive_prices_are_rejected() {
    let mut product = cake("Truffle Delight", 750);
    let update = ProductUpdate {
      price: Some(0),
      ..Default::default()
    };

    assert!(product.apply_update(update, Utc::now()).is_err());
    assert_eq!(product.price, 750);
  }

  #[test]
  fn page_count_rounds_up() {
    let filter = ProductFilter {
      limit: Some(10),
      ..Default::default()
    };

    assert_eq!(ProductPage::new(vec![], 21, &filter).total_pages, 3);
  }
}

// storefront/src/services/catalog.rs

use crate::db::Stores;
use crate::errors::{AppError, Result};
use crate::models::review::rating_summary;
use crate::models::{Product, Review};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Looks a product up by id, or by slug when `id_or_slug` is not a UUID.
pub async fn find_product(stores: &Stores, id_or_slug: &str) -> Result<Product> {
  let key = id_or_slug.trim();
  let found = match Uuid::parse_str(key) {
    Ok(id) => stores.products.find_by_id(id).await?,
    Err(_) => stores.products.find_by_slug(&key.to_lowercase()).await?,
  };
  found.ok_or_else(|| AppError::NotFound(format!("Product '{}' not found", key)))
}

pub async fn find_review(stores: &Stores, review_id: Uuid) -> Result<Review> {
  stores
    .reviews
    .find(review_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
}

/// Recomputes a product's rating from its approved reviews.
#[instrument(name = "catalog::refresh_product_rating", skip(stores), err(Display))]
pub async fn refresh_product_rating(stores: &Stores, product_id: Uuid) -> Result<(f64, i32)> {
  let reviews = stores.reviews.list_approved(product_id).await?;
  let (average, count) = rating_summary(&reviews);
  stores.products.set_rating(product_id, average, count).await?;
  debug!(average, count, "Product rating refreshed.");
  Ok((average, count))
}

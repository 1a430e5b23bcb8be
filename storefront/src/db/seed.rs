// storefront/src/db/seed.rs

use crate::db::Stores;
use crate::errors::Result;
use crate::models::product::{NewProduct, WeightOption};
use crate::models::{Product, ProductFilter};
use chrono::Utc;
use tracing::{info, instrument};

fn weights(options: &[(&str, i64)]) -> Vec<WeightOption> {
  options
    .iter()
    .map(|(weight, price)| WeightOption {
      weight: weight.to_string(),
      price: *price,
    })
    .collect()
}

fn starter_catalog() -> Vec<NewProduct> {
  let cake = |name: &str, description: &str, price: i64, eggless: bool, featured: bool, tags: &[&str]| NewProduct {
    name: name.to_string(),
    slug: None,
    description: Some(description.to_string()),
    category: "cakes".to_string(),
    price,
    weights: weights(&[("500g", price), ("1kg", price * 2 - 100)]),
    images: vec![],
    tags: tags.iter().map(|t| t.to_string()).collect(),
    is_eggless: eggless,
    is_available: true,
    is_featured: featured,
  };

  vec![
    cake(
      "Chocolate Truffle",
      "Layers of dark chocolate sponge and ganache.",
      750,
      false,
      true,
      &["chocolate", "bestseller"],
    ),
    cake(
      "Red Velvet",
      "Classic red velvet with cream cheese frosting.",
      850,
      false,
      true,
      &["red velvet", "cream cheese"],
    ),
    cake(
      "Eggless Pineapple",
      "Light pineapple sponge with fresh cream.",
      600,
      true,
      false,
      &["fruit", "pineapple"],
    ),
    NewProduct {
      name: "Butter Croissant".to_string(),
      slug: None,
      description: Some("Flaky, all-butter croissant baked every morning.".to_string()),
      category: "pastries".to_string(),
      price: 120,
      weights: vec![],
      images: vec![],
      tags: vec!["breakfast".to_string()],
      is_eggless: true,
      is_available: true,
      is_featured: false,
    },
  ]
}

/// Inserts a small starter catalog when there are no products yet.
#[instrument(name = "db::seed_catalog", skip_all, err(Display))]
pub async fn seed_catalog(stores: &Stores) -> Result<usize> {
  let (_, existing) = stores.products.list(&ProductFilter::default()).await?;
  if existing > 0 {
    info!(existing, "Catalog already has products; skipping seed.");
    return Ok(0);
  }

  let now = Utc::now();
  let mut inserted = 0;
  for new in starter_catalog() {
    let product = Product::create(new, now)?;
    stores.products.insert(&product).await?;
    inserted += 1;
  }
  info!(inserted, "Seeded starter catalog.");
  Ok(inserted)
}

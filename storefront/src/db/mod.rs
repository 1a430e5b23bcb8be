// storefront/src/db/mod.rs

//! Data access. One trait per record family, backed either by Postgres or by
//! an in-process store used when no database is configured and in tests.

pub mod memory;
pub mod postgres;
pub mod seed;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{Admin, Order, OrderStatus, Otp, Product, ProductFilter, Review, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait OtpStore: Send + Sync {
  /// Deletes every outstanding code for `phone`.
  async fn delete_for_phone(&self, phone: &str) -> Result<u64>;

  async fn insert(&self, otp: &Otp) -> Result<()>;

  /// Most recently issued code for `phone`.
  async fn latest_for_phone(&self, phone: &str) -> Result<Option<Otp>>;

  /// Atomically bumps the attempt counter and returns the new value.
  async fn record_failed_attempt(&self, id: Uuid) -> Result<i32>;

  /// Marks the code consumed. Returns `false` if it already was.
  async fn mark_used(&self, id: Uuid) -> Result<bool>;

  async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

  async fn find_by_phone(&self, phone: &str) -> Result<Option<User>>;

  /// Inserts a new user; a phone that is already registered is a `Conflict`.
  async fn insert(&self, user: &User) -> Result<()>;

  async fn update(&self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Inserts a new order; a taken order code is a `Conflict`.
  async fn insert(&self, order: &Order) -> Result<()>;

  async fn code_exists(&self, order_code: &str) -> Result<bool>;

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;

  async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>>;

  /// Saves the mutable part of an order: status, payment, tracking, notes.
  /// The write only lands while the stored `updated_at` still equals
  /// `expected_updated_at`; a concurrent change makes it a `Conflict`.
  async fn update(&self, order: &Order, expected_updated_at: DateTime<Utc>) -> Result<()>;

  async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

  /// Newest first.
  async fn list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<Order>>;

  async fn has_delivered_product(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
  async fn get(&self) -> Result<Option<Admin>>;

  /// Creates the admin account. Fails with `Conflict` once one exists.
  async fn create(&self, admin: &Admin) -> Result<()>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
  /// Matching page and the total number of matches.
  async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)>;

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>>;

  async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>>;

  /// A taken slug is a `Conflict`.
  async fn insert(&self, product: &Product) -> Result<()>;

  async fn update(&self, product: &Product) -> Result<()>;

  async fn delete(&self, id: Uuid) -> Result<()>;

  async fn set_rating(&self, id: Uuid, average: f64, count: i32) -> Result<()>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
  /// Newest first.
  async fn list_approved(&self, product_id: Uuid) -> Result<Vec<Review>>;

  async fn find(&self, id: Uuid) -> Result<Option<Review>>;

  async fn insert(&self, review: &Review) -> Result<()>;

  /// Counts a helpful vote from `user_id`. `None` when that user already voted.
  async fn add_helpful_vote(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<Review>>;

  /// Counts a report from `user_id` and hides the review at the report
  /// threshold. `None` when that user already reported it.
  async fn add_report(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<Review>>;

  async fn set_approval(&self, id: Uuid, is_approved: bool, now: DateTime<Utc>) -> Result<Review>;

  async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Handles to every store, shared through `AppState`.
#[derive(Clone)]
pub struct Stores {
  pub otps: Arc<dyn OtpStore>,
  pub users: Arc<dyn UserStore>,
  pub orders: Arc<dyn OrderStore>,
  pub admins: Arc<dyn AdminStore>,
  pub products: Arc<dyn ProductStore>,
  pub reviews: Arc<dyn ReviewStore>,
}

impl Stores {
  pub fn postgres(store: PgStore) -> Self {
    Self::from_backend(Arc::new(store))
  }

  pub fn in_memory() -> Self {
    Self::from_backend(Arc::new(MemoryStore::default()))
  }

  fn from_backend<B>(backend: Arc<B>) -> Self
  where
    B: OtpStore + UserStore + OrderStore + AdminStore + ProductStore + ReviewStore + 'static,
  {
    Self {
      otps: backend.clone(),
      users: backend.clone(),
      orders: backend.clone(),
      admins: backend.clone(),
      products: backend.clone(),
      reviews: backend,
    }
  }
}

/// Builds the stores for `config`: Postgres with migrations applied when a
/// database URL is set, otherwise the in-memory store.
pub async fn connect(config: &AppConfig) -> Result<Stores> {
  let Some(url) = config.database_url.as_deref() else {
    tracing::warn!("DATABASE_URL is not set; using the in-memory store. Data will not survive a restart.");
    return Ok(Stores::in_memory());
  };

  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .acquire_timeout(Duration::from_secs(5))
    .connect_lazy(url)?;

  sqlx::migrate!("./migrations").run(&pool).await?;
  tracing::info!("Database migrations applied.");

  Ok(Stores::postgres(PgStore::new(pool)))
}

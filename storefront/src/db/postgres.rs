// storefront/src/db/postgres.rs

use crate::db::{AdminStore, OrderStore, OtpStore, ProductStore, ReviewStore, UserStore};
use crate::errors::{AppError, Result};
use crate::models::order::{CustomerInfo, OrderItem, OrderTotals, PaymentMethod, PaymentStatus, TrackingEntry};
use crate::models::product::{ProductSort, WeightOption};
use crate::models::review::REPORT_THRESHOLD;
use crate::models::{Address, Admin, Order, OrderStatus, Otp, Product, ProductFilter, Review, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_code, user_id, items, customer_info, subtotal, delivery_charge, discount, \
   total_amount, status, payment_status, payment_method, tracking_info, gateway_order_id, gateway_payment_id, \
   gateway_signature, paid_at, delivered_at, notes, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, name, slug, description, category, price, weights, images, tags, is_eggless, \
   is_available, is_featured, rating_average, review_count, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, product_id, user_id, author_name, rating, comment, is_verified_purchase, \
   is_approved, helpful_count, helpful_by, report_count, reported_by, created_at, updated_at";

/// Postgres-backed implementation of every store trait.
#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// No row back from a guarded vote means either a repeat vote or a
  /// missing review.
  async fn counted_or_repeat(&self, id: Uuid, row: Option<ReviewRow>) -> Result<Option<Review>> {
    if let Some(row) = row {
      return Ok(Some(Review::from(row)));
    }
    match ReviewStore::find(self, id).await? {
      Some(_) => Ok(None),
      None => Err(AppError::NotFound("Review not found".to_string())),
    }
  }
}

fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
  match &err {
    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(message.to_string()),
    _ => AppError::Sqlx(err),
  }
}

fn expect_one_row(rows_affected: u64, what: &str) -> Result<()> {
  if rows_affected == 0 {
    return Err(AppError::NotFound(format!("{} not found", what)));
  }
  Ok(())
}

#[derive(FromRow)]
struct UserRow {
  id: Uuid,
  phone: String,
  is_verified: bool,
  name: Option<String>,
  email: Option<String>,
  addresses: Json<Vec<Address>>,
  last_login_at: Option<DateTime<Utc>>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
  fn from(row: UserRow) -> Self {
    Self {
      id: row.id,
      phone: row.phone,
      is_verified: row.is_verified,
      name: row.name,
      email: row.email,
      addresses: row.addresses.0,
      last_login_at: row.last_login_at,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  order_code: String,
  user_id: Option<Uuid>,
  items: Json<Vec<OrderItem>>,
  customer_info: Json<CustomerInfo>,
  subtotal: i64,
  delivery_charge: i64,
  discount: i64,
  total_amount: i64,
  status: OrderStatus,
  payment_status: PaymentStatus,
  payment_method: PaymentMethod,
  tracking_info: Json<Vec<TrackingEntry>>,
  gateway_order_id: Option<String>,
  gateway_payment_id: Option<String>,
  gateway_signature: Option<String>,
  paid_at: Option<DateTime<Utc>>,
  delivered_at: Option<DateTime<Utc>>,
  notes: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
  fn from(row: OrderRow) -> Self {
    Self {
      id: row.id,
      order_code: row.order_code,
      user_id: row.user_id,
      items: row.items.0,
      customer_info: row.customer_info.0,
      totals: OrderTotals {
        subtotal: row.subtotal,
        delivery_charge: row.delivery_charge,
        discount: row.discount,
        total_amount: row.total_amount,
      },
      status: row.status,
      payment_status: row.payment_status,
      payment_method: row.payment_method,
      tracking_info: row.tracking_info.0,
      gateway_order_id: row.gateway_order_id,
      gateway_payment_id: row.gateway_payment_id,
      gateway_signature: row.gateway_signature,
      paid_at: row.paid_at,
      delivered_at: row.delivered_at,
      notes: row.notes,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(FromRow)]
struct ProductRow {
  id: Uuid,
  name: String,
  slug: String,
  description: Option<String>,
  category: String,
  price: i64,
  weights: Json<Vec<WeightOption>>,
  images: Vec<String>,
  tags: Vec<String>,
  is_eggless: bool,
  is_available: bool,
  is_featured: bool,
  rating_average: f64,
  review_count: i32,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
  fn from(row: ProductRow) -> Self {
    Self {
      id: row.id,
      name: row.name,
      slug: row.slug,
      description: row.description,
      category: row.category,
      price: row.price,
      weights: row.weights.0,
      images: row.images,
      tags: row.tags,
      is_eggless: row.is_eggless,
      is_available: row.is_available,
      is_featured: row.is_featured,
      rating_average: row.rating_average,
      review_count: row.review_count,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(FromRow)]
struct ReviewRow {
  id: Uuid,
  product_id: Uuid,
  user_id: Option<Uuid>,
  author_name: String,
  rating: i16,
  comment: String,
  is_verified_purchase: bool,
  is_approved: bool,
  helpful_count: i32,
  helpful_by: Vec<Uuid>,
  report_count: i32,
  reported_by: Vec<Uuid>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
  fn from(row: ReviewRow) -> Self {
    Self {
      id: row.id,
      product_id: row.product_id,
      user_id: row.user_id,
      author_name: row.author_name,
      rating: row.rating,
      comment: row.comment,
      is_verified_purchase: row.is_verified_purchase,
      is_approved: row.is_approved,
      helpful_count: row.helpful_count,
      helpful_by: row.helpful_by,
      report_count: row.report_count,
      reported_by: row.reported_by,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[async_trait]
impl OtpStore for PgStore {
  #[instrument(name = "pg::otp_delete_for_phone", skip_all, err(Display))]
  async fn delete_for_phone(&self, phone: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM otps WHERE phone = $1")
      .bind(phone)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  async fn insert(&self, otp: &Otp) -> Result<()> {
    sqlx::query("INSERT INTO otps (id, phone, code, created_at, is_used, attempts) VALUES ($1, $2, $3, $4, $5, $6)")
      .bind(otp.id)
      .bind(&otp.phone)
      .bind(&otp.code)
      .bind(otp.created_at)
      .bind(otp.is_used)
      .bind(otp.attempts)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn latest_for_phone(&self, phone: &str) -> Result<Option<Otp>> {
    let otp = sqlx::query_as::<_, Otp>(
      "SELECT id, phone, code, created_at, is_used, attempts FROM otps WHERE phone = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(phone)
    .fetch_optional(&self.pool)
    .await?;
    Ok(otp)
  }

  async fn record_failed_attempt(&self, id: Uuid) -> Result<i32> {
    let attempts: Option<i32> = sqlx::query_scalar("UPDATE otps SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    attempts.ok_or_else(|| AppError::NotFound("OTP not found".to_string()))
  }

  async fn mark_used(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE otps SET is_used = TRUE WHERE id = $1 AND is_used = FALSE")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM otps WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(())
  }
}

#[async_trait]
impl UserStore for PgStore {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(User::from))
  }

  async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE phone = $1")
      .bind(phone)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(User::from))
  }

  #[instrument(name = "pg::user_insert", skip_all, fields(user_id = %user.id), err(Display))]
  async fn insert(&self, user: &User) -> Result<()> {
    sqlx::query(
      "INSERT INTO users (id, phone, is_verified, name, email, addresses, last_login_at, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(user.id)
    .bind(&user.phone)
    .bind(user.is_verified)
    .bind(&user.name)
    .bind(&user.email)
    .bind(Json(&user.addresses))
    .bind(user.last_login_at)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_on_unique(e, "Phone number is already registered"))?;
    Ok(())
  }

  async fn update(&self, user: &User) -> Result<()> {
    let result = sqlx::query(
      "UPDATE users SET is_verified = $2, name = $3, email = $4, addresses = $5, last_login_at = $6, updated_at = $7 \
       WHERE id = $1",
    )
    .bind(user.id)
    .bind(user.is_verified)
    .bind(&user.name)
    .bind(&user.email)
    .bind(Json(&user.addresses))
    .bind(user.last_login_at)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await?;
    expect_one_row(result.rows_affected(), "User")
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "pg::order_insert", skip_all, fields(order_code = %order.order_code), err(Display))]
  async fn insert(&self, order: &Order) -> Result<()> {
    sqlx::query(&format!(
      "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
       $18, $19, $20, $21)",
      ORDER_COLUMNS
    ))
    .bind(order.id)
    .bind(&order.order_code)
    .bind(order.user_id)
    .bind(Json(&order.items))
    .bind(Json(&order.customer_info))
    .bind(order.totals.subtotal)
    .bind(order.totals.delivery_charge)
    .bind(order.totals.discount)
    .bind(order.totals.total_amount)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(Json(&order.tracking_info))
    .bind(&order.gateway_order_id)
    .bind(&order.gateway_payment_id)
    .bind(&order.gateway_signature)
    .bind(order.paid_at)
    .bind(order.delivered_at)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_on_unique(e, "Order code is already taken"))?;
    Ok(())
  }

  async fn code_exists(&self, order_code: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE order_code = $1)")
      .bind(order_code)
      .fetch_one(&self.pool)
      .await?;
    Ok(exists)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE order_code = $1", ORDER_COLUMNS))
      .bind(order_code)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  #[instrument(name = "pg::order_update", skip_all, fields(order_code = %order.order_code), err(Display))]
  async fn update(&self, order: &Order, expected_updated_at: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
      "UPDATE orders SET status = $2, payment_status = $3, payment_method = $4, tracking_info = $5, \
       gateway_order_id = $6, gateway_payment_id = $7, gateway_signature = $8, paid_at = $9, delivered_at = $10, \
       notes = $11, updated_at = $12 WHERE id = $1 AND updated_at = $13",
    )
    .bind(order.id)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(Json(&order.tracking_info))
    .bind(&order.gateway_order_id)
    .bind(&order.gateway_payment_id)
    .bind(&order.gateway_signature)
    .bind(order.paid_at)
    .bind(order.delivered_at)
    .bind(&order.notes)
    .bind(order.updated_at)
    .bind(expected_updated_at)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 1 {
      return Ok(());
    }
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
      .bind(order.id)
      .fetch_one(&self.pool)
      .await?;
    if exists {
      return Err(AppError::Conflict(
        "Order was changed by another request. Please reload and try again.".to_string(),
      ));
    }
    Err(AppError::NotFound("Order not found".to_string()))
  }

  async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(Order::from).collect())
  }

  async fn list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {} FROM orders WHERE ($1::order_status IS NULL OR status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
      ORDER_COLUMNS
    ))
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(Order::from).collect())
  }

  async fn has_delivered_product(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
      "SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1 AND status = 'delivered' AND items @> $2)",
    )
    .bind(user_id)
    .bind(Json(json!([{ "productId": product_id }])))
    .fetch_one(&self.pool)
    .await?;
    Ok(exists)
  }
}

#[async_trait]
impl AdminStore for PgStore {
  async fn get(&self) -> Result<Option<Admin>> {
    let admin = sqlx::query_as::<_, Admin>(
      "SELECT id, email, password_hash, whatsapp_number, created_at, updated_at FROM admins LIMIT 1",
    )
    .fetch_optional(&self.pool)
    .await?;
    Ok(admin)
  }

  #[instrument(name = "pg::admin_create", skip_all, err(Display))]
  async fn create(&self, admin: &Admin) -> Result<()> {
    sqlx::query(
      "INSERT INTO admins (id, email, password_hash, whatsapp_number, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(admin.id)
    .bind(&admin.email)
    .bind(&admin.password_hash)
    .bind(&admin.whatsapp_number)
    .bind(admin.created_at)
    .bind(admin.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_on_unique(e, "An admin account already exists"))?;
    Ok(())
  }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
  qb.push(" WHERE is_available = TRUE");
  if let Some(category) = filter.category_term() {
    qb.push(" AND category = ").push_bind(category);
  }
  if let Some(term) = filter.search_term() {
    let pattern = format!("%{}%", term);
    qb.push(" AND (LOWER(name) LIKE ")
      .push_bind(pattern.clone())
      .push(" OR LOWER(COALESCE(description, '')) LIKE ")
      .push_bind(pattern.clone())
      .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag LIKE ")
      .push_bind(pattern)
      .push("))");
  }
  if filter.eggless == Some(true) {
    qb.push(" AND is_eggless = TRUE");
  }
  if filter.featured == Some(true) {
    qb.push(" AND is_featured = TRUE");
  }
  if let Some(min) = filter.min_price {
    qb.push(" AND price >= ").push_bind(min);
  }
  if let Some(max) = filter.max_price {
    qb.push(" AND price <= ").push_bind(max);
  }
}

#[async_trait]
impl ProductStore for PgStore {
  #[instrument(name = "pg::product_list", skip_all, err(Display))]
  async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    push_product_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
    push_product_filters(&mut qb, filter);
    qb.push(match filter.sort {
      ProductSort::Newest => " ORDER BY created_at DESC",
      ProductSort::PriceAsc => " ORDER BY price ASC, created_at DESC",
      ProductSort::PriceDesc => " ORDER BY price DESC, created_at DESC",
      ProductSort::Rating => " ORDER BY rating_average DESC, review_count DESC",
    });
    qb.push(" LIMIT ")
      .push_bind(i64::from(filter.limit()))
      .push(" OFFSET ")
      .push_bind(i64::from(filter.offset()));

    let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
    Ok((rows.into_iter().map(Product::from).collect(), total))
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Product::from))
  }

  async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {} FROM products WHERE slug = $1", PRODUCT_COLUMNS))
      .bind(slug)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Product::from))
  }

  async fn insert(&self, product: &Product) -> Result<()> {
    sqlx::query(&format!(
      "INSERT INTO products ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
      PRODUCT_COLUMNS
    ))
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.slug)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price)
    .bind(Json(&product.weights))
    .bind(&product.images)
    .bind(&product.tags)
    .bind(product.is_eggless)
    .bind(product.is_available)
    .bind(product.is_featured)
    .bind(product.rating_average)
    .bind(product.review_count)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| conflict_on_unique(e, "A product with this slug already exists"))?;
    Ok(())
  }

  async fn update(&self, product: &Product) -> Result<()> {
    let result = sqlx::query(
      "UPDATE products SET name = $2, description = $3, category = $4, price = $5, weights = $6, images = $7, \
       tags = $8, is_eggless = $9, is_available = $10, is_featured = $11, updated_at = $12 WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price)
    .bind(Json(&product.weights))
    .bind(&product.images)
    .bind(&product.tags)
    .bind(product.is_eggless)
    .bind(product.is_available)
    .bind(product.is_featured)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;
    expect_one_row(result.rows_affected(), "Product")
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    expect_one_row(result.rows_affected(), "Product")
  }

  async fn set_rating(&self, id: Uuid, average: f64, count: i32) -> Result<()> {
    sqlx::query("UPDATE products SET rating_average = $2, review_count = $3 WHERE id = $1")
      .bind(id)
      .bind(average)
      .bind(count)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl ReviewStore for PgStore {
  async fn list_approved(&self, product_id: Uuid) -> Result<Vec<Review>> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
      "SELECT {} FROM reviews WHERE product_id = $1 AND is_approved = TRUE ORDER BY created_at DESC",
      REVIEW_COLUMNS
    ))
    .bind(product_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(Review::from).collect())
  }

  async fn find(&self, id: Uuid) -> Result<Option<Review>> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Review::from))
  }

  async fn insert(&self, review: &Review) -> Result<()> {
    sqlx::query(&format!(
      "INSERT INTO reviews ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
      REVIEW_COLUMNS
    ))
    .bind(review.id)
    .bind(review.product_id)
    .bind(review.user_id)
    .bind(&review.author_name)
    .bind(review.rating)
    .bind(&review.comment)
    .bind(review.is_verified_purchase)
    .bind(review.is_approved)
    .bind(review.helpful_count)
    .bind(&review.helpful_by)
    .bind(review.report_count)
    .bind(&review.reported_by)
    .bind(review.created_at)
    .bind(review.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(name = "pg::review_helpful", skip(self), err(Display))]
  async fn add_helpful_vote(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<Review>> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
      "UPDATE reviews SET helpful_by = array_append(helpful_by, $2), helpful_count = helpful_count + 1, \
       updated_at = $3 WHERE id = $1 AND NOT ($2 = ANY(helpful_by)) RETURNING {}",
      REVIEW_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .bind(now)
    .fetch_optional(&self.pool)
    .await?;
    self.counted_or_repeat(id, row).await
  }

  #[instrument(name = "pg::review_report", skip(self), err(Display))]
  async fn add_report(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<Review>> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
      "UPDATE reviews SET reported_by = array_append(reported_by, $2), report_count = report_count + 1, \
       is_approved = CASE WHEN report_count + 1 >= $4 THEN FALSE ELSE is_approved END, updated_at = $3 \
       WHERE id = $1 AND NOT ($2 = ANY(reported_by)) RETURNING {}",
      REVIEW_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .bind(now)
    .bind(REPORT_THRESHOLD)
    .fetch_optional(&self.pool)
    .await?;
    self.counted_or_repeat(id, row).await
  }

  async fn set_approval(&self, id: Uuid, is_approved: bool, now: DateTime<Utc>) -> Result<Review> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
      "UPDATE reviews SET is_approved = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
      REVIEW_COLUMNS
    ))
    .bind(id)
    .bind(is_approved)
    .bind(now)
    .fetch_optional(&self.pool)
    .await?;
    row
      .map(Review::from)
      .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    expect_one_row(result.rows_affected(), "Review")
  }
}

// storefront/src/db/memory.rs

use crate::db::{AdminStore, OrderStore, OtpStore, ProductStore, ReviewStore, UserStore};
use crate::errors::{AppError, Result};
use crate::models::{Admin, Order, OrderStatus, Otp, Product, ProductFilter, Review, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  otps: Vec<Otp>,
  users: HashMap<Uuid, User>,
  orders: Vec<Order>,
  admin: Option<Admin>,
  products: Vec<Product>,
  reviews: Vec<Review>,
}

/// Process-local store. Every call takes the lock once and never awaits
/// while holding it.
#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

fn order_changed() -> AppError {
  AppError::Conflict("Order was changed by another request. Please reload and try again.".to_string())
}

fn find_review_mut(reviews: &mut [Review], id: Uuid) -> Result<&mut Review> {
  reviews
    .iter_mut()
    .find(|r| r.id == id)
    .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
}

#[async_trait]
impl OtpStore for MemoryStore {
  async fn delete_for_phone(&self, phone: &str) -> Result<u64> {
    let mut tables = self.tables.lock();
    let before = tables.otps.len();
    tables.otps.retain(|otp| otp.phone != phone);
    Ok((before - tables.otps.len()) as u64)
  }

  async fn insert(&self, otp: &Otp) -> Result<()> {
    self.tables.lock().otps.push(otp.clone());
    Ok(())
  }

  async fn latest_for_phone(&self, phone: &str) -> Result<Option<Otp>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .otps
        .iter()
        .filter(|otp| otp.phone == phone)
        .max_by_key(|otp| otp.created_at)
        .cloned(),
    )
  }

  async fn record_failed_attempt(&self, id: Uuid) -> Result<i32> {
    let mut tables = self.tables.lock();
    let otp = tables
      .otps
      .iter_mut()
      .find(|otp| otp.id == id)
      .ok_or_else(|| AppError::NotFound("OTP not found".to_string()))?;
    otp.attempts += 1;
    Ok(otp.attempts)
  }

  async fn mark_used(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    match tables.otps.iter_mut().find(|otp| otp.id == id) {
      Some(otp) if !otp.is_used => {
        otp.is_used = true;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    self.tables.lock().otps.retain(|otp| otp.id != id);
    Ok(())
  }
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.lock().users.get(&id).cloned())
  }

  async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
    Ok(self.tables.lock().users.values().find(|u| u.phone == phone).cloned())
  }

  async fn insert(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables.users.values().any(|u| u.phone == user.phone) {
      return Err(AppError::Conflict("Phone number is already registered".to_string()));
    }
    tables.users.insert(user.id, user.clone());
    Ok(())
  }

  async fn update(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.lock();
    let stored = tables
      .users
      .get_mut(&user.id)
      .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    *stored = user.clone();
    Ok(())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert(&self, order: &Order) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables.orders.iter().any(|o| o.order_code == order.order_code) {
      return Err(AppError::Conflict("Order code is already taken".to_string()));
    }
    tables.orders.push(order.clone());
    Ok(())
  }

  async fn code_exists(&self, order_code: &str) -> Result<bool> {
    Ok(self.tables.lock().orders.iter().any(|o| o.order_code == order_code))
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.iter().find(|o| o.id == id).cloned())
  }

  async fn find_by_code(&self, order_code: &str) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.iter().find(|o| o.order_code == order_code).cloned())
  }

  async fn update(&self, order: &Order, expected_updated_at: DateTime<Utc>) -> Result<()> {
    let mut tables = self.tables.lock();
    let stored = tables
      .orders
      .iter_mut()
      .find(|o| o.id == order.id)
      .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    if stored.updated_at != expected_updated_at {
      return Err(order_changed());
    }
    stored.status = order.status;
    stored.payment_status = order.payment_status;
    stored.payment_method = order.payment_method;
    stored.tracking_info = order.tracking_info.clone();
    stored.gateway_order_id = order.gateway_order_id.clone();
    stored.gateway_payment_id = order.gateway_payment_id.clone();
    stored.gateway_signature = order.gateway_signature.clone();
    stored.paid_at = order.paid_at;
    stored.delivered_at = order.delivered_at;
    stored.notes = order.notes.clone();
    stored.updated_at = order.updated_at;
    Ok(())
  }

  async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    let mut orders: Vec<Order> = tables.orders.iter().filter(|o| o.user_id == Some(user_id)).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    let mut orders: Vec<Order> = tables
      .orders
      .iter()
      .filter(|o| status.map_or(true, |s| o.status == s))
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(
      orders
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect(),
    )
  }

  async fn has_delivered_product(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let tables = self.tables.lock();
    Ok(tables.orders.iter().any(|o| {
      o.user_id == Some(user_id) && o.status == OrderStatus::Delivered && o.contains_product(product_id)
    }))
  }
}

#[async_trait]
impl AdminStore for MemoryStore {
  async fn get(&self) -> Result<Option<Admin>> {
    Ok(self.tables.lock().admin.clone())
  }

  async fn create(&self, admin: &Admin) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables.admin.is_some() {
      return Err(AppError::Conflict("An admin account already exists".to_string()));
    }
    tables.admin = Some(admin.clone());
    Ok(())
  }
}

#[async_trait]
impl ProductStore for MemoryStore {
  async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
    let tables = self.tables.lock();
    let mut matches: Vec<&Product> = tables.products.iter().filter(|p| filter.matches(p)).collect();
    matches.sort_by(|a, b| filter.compare(a, b));
    let total = matches.len() as i64;
    let page = matches
      .into_iter()
      .skip(filter.offset() as usize)
      .take(filter.limit() as usize)
      .cloned()
      .collect();
    Ok((page, total))
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.iter().find(|p| p.id == id).cloned())
  }

  async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.iter().find(|p| p.slug == slug).cloned())
  }

  async fn insert(&self, product: &Product) -> Result<()> {
    let mut tables = self.tables.lock();
    if tables.products.iter().any(|p| p.slug == product.slug) {
      return Err(AppError::Conflict("A product with this slug already exists".to_string()));
    }
    tables.products.push(product.clone());
    Ok(())
  }

  async fn update(&self, product: &Product) -> Result<()> {
    let mut tables = self.tables.lock();
    let stored = tables
      .products
      .iter_mut()
      .find(|p| p.id == product.id)
      .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    let (rating_average, review_count) = (stored.rating_average, stored.review_count);
    *stored = product.clone();
    stored.rating_average = rating_average;
    stored.review_count = review_count;
    Ok(())
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let mut tables = self.tables.lock();
    let before = tables.products.len();
    tables.products.retain(|p| p.id != id);
    if tables.products.len() == before {
      return Err(AppError::NotFound("Product not found".to_string()));
    }
    tables.reviews.retain(|r| r.product_id != id);
    Ok(())
  }

  async fn set_rating(&self, id: Uuid, average: f64, count: i32) -> Result<()> {
    let mut tables = self.tables.lock();
    if let Some(product) = tables.products.iter_mut().find(|p| p.id == id) {
      product.rating_average = average;
      product.review_count = count;
    }
    Ok(())
  }
}

#[async_trait]
impl ReviewStore for MemoryStore {
  async fn list_approved(&self, product_id: Uuid) -> Result<Vec<Review>> {
    let tables = self.tables.lock();
    let mut reviews: Vec<Review> = tables
      .reviews
      .iter()
      .filter(|r| r.product_id == product_id && r.is_approved)
      .cloned()
      .collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(reviews)
  }

  async fn find(&self, id: Uuid) -> Result<Option<Review>> {
    Ok(self.tables.lock().reviews.iter().find(|r| r.id == id).cloned())
  }

  async fn insert(&self, review: &Review) -> Result<()> {
    self.tables.lock().reviews.push(review.clone());
    Ok(())
  }

  async fn add_helpful_vote(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<Review>> {
    let mut tables = self.tables.lock();
    let stored = find_review_mut(&mut tables.reviews, id)?;
    Ok(stored.mark_helpful(user_id, now).then(|| stored.clone()))
  }

  async fn add_report(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<Review>> {
    let mut tables = self.tables.lock();
    let stored = find_review_mut(&mut tables.reviews, id)?;
    Ok(stored.report(user_id, now).then(|| stored.clone()))
  }

  async fn set_approval(&self, id: Uuid, is_approved: bool, now: DateTime<Utc>) -> Result<Review> {
    let mut tables = self.tables.lock();
    let stored = find_review_mut(&mut tables.reviews, id)?;
    stored.is_approved = is_approved;
    stored.updated_at = now;
    Ok(stored.clone())
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let mut tables = self.tables.lock();
    let before = tables.reviews.len();
    tables.reviews.retain(|r| r.id != id);
    if tables.reviews.len() == before {
      return Err(AppError::NotFound("Review not found".to_string()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, Utc};

  #[tokio::test]
  async fn latest_otp_is_the_newest() {
    let store = MemoryStore::default();
    let now = Utc::now();
    let older = Otp::issue("9876543210", now - Duration::minutes(1));
    let newer = Otp::issue("9876543210", now);
    OtpStore::insert(&store, &older).await.unwrap();
    OtpStore::insert(&store, &newer).await.unwrap();

    let latest = store.latest_for_phone("9876543210").await.unwrap().unwrap();

    assert_eq!(latest.id, newer.id);
  }

  #[tokio::test]
  async fn otp_can_be_consumed_once() {
    let store = MemoryStore::default();
    let otp = Otp::issue("9876543210", Utc::now());
    OtpStore::insert(&store, &otp).await.unwrap();

    assert!(store.mark_used(otp.id).await.unwrap());
    assert!(!store.mark_used(otp.id).await.unwrap());
  }

  fn stored_order() -> Order {
    let items = vec![crate::models::OrderItem {
      product_id: None,
      name: "Black Forest".to_string(),
      price: 900,
      quantity: 1,
      weight: None,
      image: None,
    }];
    let totals = crate::models::OrderTotals::compute(&items, 0, 0).unwrap();
    let customer = crate::models::order::validate_customer(&crate::models::order::NewCustomerInfo {
      name: Some("Asha".to_string()),
      phone: Some("9876543210".to_string()),
      address: Some("12 MG Road".to_string()),
      delivery_date: Some("2030-02-14".to_string()),
      time_slot: Some("4 PM - 6 PM".to_string()),
      ..Default::default()
    })
    .unwrap();
    Order::place(
      "ORD-300214-00001".to_string(),
      None,
      items,
      customer,
      totals,
      crate::models::PaymentMethod::CashOnDelivery,
      Utc::now() - Duration::minutes(5),
    )
  }

  #[tokio::test]
  async fn stale_order_write_is_a_conflict() {
    let store = MemoryStore::default();
    let order = stored_order();
    OrderStore::insert(&store, &order).await.unwrap();
    let loaded_at = order.updated_at;

    let mut admin_copy = order.clone();
    admin_copy.transition_to(OrderStatus::Preparing, None, Utc::now()).unwrap();
    OrderStore::update(&store, &admin_copy, loaded_at).await.unwrap();

    let mut stale_copy = order.clone();
    stale_copy.confirm_cash_on_delivery(Utc::now()).unwrap();
    let result = OrderStore::update(&store, &stale_copy, loaded_at).await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    let current = OrderStore::find_by_id(&store, order.id).await.unwrap().unwrap();
    assert_eq!(current.status, OrderStatus::Preparing);
  }

  #[tokio::test]
  async fn votes_and_reports_count_once_per_user() {
    let store = MemoryStore::default();
    let review = Review::write(
      Uuid::new_v4(),
      None,
      None,
      crate::models::review::NewReview {
        rating: 5,
        comment: "Moist and rich".to_string(),
        author_name: None,
      },
      false,
      Utc::now(),
    )
    .unwrap();
    ReviewStore::insert(&store, &review).await.unwrap();
    let voter = Uuid::new_v4();

    let first = store.add_helpful_vote(review.id, voter, Utc::now()).await.unwrap();
    let repeat = store.add_helpful_vote(review.id, voter, Utc::now()).await.unwrap();
    store.add_helpful_vote(review.id, Uuid::new_v4(), Utc::now()).await.unwrap();

    assert_eq!(first.map(|r| r.helpful_count), Some(1));
    assert!(repeat.is_none());
    assert_eq!(store.find(review.id).await.unwrap().unwrap().helpful_count, 2);

    for _ in 0..crate::models::review::REPORT_THRESHOLD {
      store.add_report(review.id, Uuid::new_v4(), Utc::now()).await.unwrap();
    }
    assert!(!store.find(review.id).await.unwrap().unwrap().is_approved);
    assert!(store.set_approval(review.id, true, Utc::now()).await.unwrap().is_approved);
    assert!(matches!(
      store.add_helpful_vote(Uuid::new_v4(), voter, Utc::now()).await,
      Err(AppError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn second_admin_is_a_conflict() {
    let store = MemoryStore::default();
    let admin = Admin {
      id: Uuid::new_v4(),
      email: "owner@bakehouse.test".to_string(),
      password_hash: "hash".to_string(),
      whatsapp_number: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    };

    store.create(&admin).await.unwrap();
    let second = store.create(&Admin { id: Uuid::new_v4(), ..admin }).await;

    assert!(matches!(second, Err(AppError::Conflict(_))));
  }
}

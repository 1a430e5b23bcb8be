// storefront/src/models/order.rs

use crate::errors::AppError;
use crate::models::phone::PhoneNumber;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Preparing,
  OutForDelivery,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Preparing => "preparing",
      OrderStatus::OutForDelivery => "out_for_delivery",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  /// Position on the delivery track. `Cancelled` is off the track.
  fn stage(self) -> Option<u8> {
    match self {
      OrderStatus::Pending => Some(0),
      OrderStatus::Confirmed => Some(1),
      OrderStatus::Preparing => Some(2),
      OrderStatus::OutForDelivery => Some(3),
      OrderStatus::Delivered => Some(4),
      OrderStatus::Cancelled => None,
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }

  /// Transition table: forward along the track (skips allowed), or to
  /// `Cancelled` from any non-terminal status. Nothing leaves a terminal status.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    if self.is_terminal() {
      return false;
    }
    match (self.stage(), next.stage()) {
      (_, None) => true,
      (Some(current), Some(target)) => target > current,
      (None, Some(_)) => false,
    }
  }

  /// Customer-facing label used in notifications and the tracking log.
  pub fn label(self) -> &'static str {
    match self {
      OrderStatus::Pending => "Order placed",
      OrderStatus::Confirmed => "Order confirmed",
      OrderStatus::Preparing => "Being prepared",
      OrderStatus::OutForDelivery => "Out for delivery",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s.trim())
      .ok_or_else(|| AppError::Validation(format!("Unknown order status '{}'", s)))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

impl PaymentStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Paid => "paid",
      PaymentStatus::Failed => "failed",
      PaymentStatus::Refunded => "refunded",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  #[serde(alias = "razorpay")]
  Online,
  #[serde(alias = "cod")]
  CashOnDelivery,
}

impl PaymentMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentMethod::Online => "online",
      PaymentMethod::CashOnDelivery => "cash_on_delivery",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      PaymentMethod::Online => "Paid online",
      PaymentMethod::CashOnDelivery => "Cash on delivery",
    }
  }
}

impl FromStr for PaymentMethod {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "online" | "razorpay" => Ok(PaymentMethod::Online),
      "cod" | "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
      other => Err(AppError::Validation(format!("Unsupported payment method '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Option<Uuid>,
  /// Name at the time of purchase.
  pub name: String,
  /// Unit price in rupees.
  pub price: i64,
  pub quantity: i32,
  pub weight: Option<String>,
  pub image: Option<String>,
}

/// Upper bound on a single item's unit price, in rupees.
pub const MAX_ITEM_PRICE: i64 = 1_000_000;
pub const MAX_ITEM_QUANTITY: i32 = 100;
pub const MAX_ORDER_LINES: usize = 50;

fn amount_overflow() -> AppError {
  AppError::Validation("Order amount is too large".to_string())
}

impl OrderItem {
  pub fn line_total(&self) -> Result<i64, AppError> {
    self.price.checked_mul(i64::from(self.quantity)).ok_or_else(amount_overflow)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
  pub name: String,
  pub phone: String,
  pub email: Option<String>,
  pub address: String,
  pub city: Option<String>,
  pub pincode: Option<String>,
  pub delivery_date: NaiveDate,
  pub time_slot: String,
  pub cake_message: Option<String>,
  pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEntry {
  pub status: OrderStatus,
  pub timestamp: DateTime<Utc>,
  pub note: Option<String>,
}

/// Rupee amounts of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
  pub subtotal: i64,
  pub delivery_charge: i64,
  pub discount: i64,
  pub total_amount: i64,
}

impl OrderTotals {
  /// Discount is clamped to the subtotal so the total never goes below the
  /// delivery charge.
  pub fn compute(items: &[OrderItem], delivery_charge: i64, discount: i64) -> Result<Self, AppError> {
    let subtotal = Self::subtotal_of(items)?;
    let discount = discount.clamp(0, subtotal);
    let total_amount = subtotal
      .checked_add(delivery_charge)
      .and_then(|t| t.checked_sub(discount))
      .ok_or_else(amount_overflow)?;
    Ok(Self {
      subtotal,
      delivery_charge,
      discount,
      total_amount,
    })
  }

  pub fn subtotal_of(items: &[OrderItem]) -> Result<i64, AppError> {
    items.iter().try_fold(0i64, |acc, item| {
      acc.checked_add(item.line_total()?).ok_or_else(amount_overflow)
    })
  }
}

/// Checkout payload line. Everything is optional so that a missing field is
/// reported as a validation message rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
  #[serde(alias = "id")]
  pub product_id: Option<Uuid>,
  pub name: Option<String>,
  pub price: Option<i64>,
  pub quantity: Option<i32>,
  pub weight: Option<String>,
  pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerInfo {
  pub name: Option<String>,
  pub phone: Option<String>,
  pub email: Option<String>,
  pub address: Option<String>,
  pub city: Option<String>,
  pub pincode: Option<String>,
  pub delivery_date: Option<String>,
  pub time_slot: Option<String>,
  pub cake_message: Option<String>,
  pub special_instructions: Option<String>,
}

/// Body of `POST /orders/create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
  #[serde(default)]
  pub items: Vec<NewOrderItem>,
  #[serde(default)]
  pub customer_info: NewCustomerInfo,
  pub total_amount: Option<i64>,
  pub payment_method: Option<String>,
  pub discount: Option<i64>,
}

pub fn validate_items(items: &[NewOrderItem]) -> Result<Vec<OrderItem>, AppError> {
  if items.is_empty() {
    return Err(AppError::Validation("Your cart is empty".to_string()));
  }
  if items.len() > MAX_ORDER_LINES {
    return Err(AppError::Validation(format!(
      "An order can have at most {} items",
      MAX_ORDER_LINES
    )));
  }
  items
    .iter()
    .enumerate()
    .map(|(idx, item)| {
      let line = idx + 1;
      let name = required(item.name.as_deref()).ok_or_else(|| {
        AppError::Validation(format!("Item {} is missing a name", line))
      })?;
      let price = item
        .price
        .filter(|p| (1..=MAX_ITEM_PRICE).contains(p))
        .ok_or_else(|| AppError::Validation(format!("Item {} has an invalid price", line)))?;
      let quantity = item
        .quantity
        .filter(|q| (1..=MAX_ITEM_QUANTITY).contains(q))
        .ok_or_else(|| AppError::Validation(format!("Item {} has an invalid quantity", line)))?;
      Ok(OrderItem {
        product_id: item.product_id,
        name,
        price,
        quantity,
        weight: required(item.weight.as_deref()),
        image: required(item.image.as_deref()),
      })
    })
    .collect()
}

pub fn validate_customer(info: &NewCustomerInfo) -> Result<CustomerInfo, AppError> {
  let missing = |field: &str| AppError::Validation(format!("{} is required", field));

  let name = required(info.name.as_deref()).ok_or_else(|| missing("Name"))?;
  let raw_phone = required(info.phone.as_deref()).ok_or_else(|| missing("Phone number"))?;
  let phone = PhoneNumber::parse(&raw_phone)?;
  let address = required(info.address.as_deref()).ok_or_else(|| missing("Delivery address"))?;
  let raw_date = required(info.delivery_date.as_deref()).ok_or_else(|| missing("Delivery date"))?;
  let delivery_date = parse_delivery_date(&raw_date)?;
  let time_slot = required(info.time_slot.as_deref()).ok_or_else(|| missing("Delivery time slot"))?;

  Ok(CustomerInfo {
    name,
    phone: phone.as_str().to_string(),
    email: required(info.email.as_deref()),
    address,
    city: required(info.city.as_deref()),
    pincode: required(info.pincode.as_deref()),
    delivery_date,
    time_slot,
    cake_message: required(info.cake_message.as_deref()),
    special_instructions: required(info.special_instructions.as_deref()),
  })
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_delivery_date(raw: &str) -> Result<NaiveDate, AppError> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
    .map_err(|_| AppError::Validation("Delivery date must be a valid date".to_string()))
}

fn required(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub order_code: String,
  pub user_id: Option<Uuid>,
  pub items: Vec<OrderItem>,
  pub customer_info: CustomerInfo,
  #[serde(flatten)]
  pub totals: OrderTotals,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub payment_method: PaymentMethod,
  pub tracking_info: Vec<TrackingEntry>,
  pub gateway_order_id: Option<String>,
  pub gateway_payment_id: Option<String>,
  #[serde(skip_serializing)]
  pub gateway_signature: Option<String>,
  pub paid_at: Option<DateTime<Utc>>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// A freshly placed order: pending, unpaid, one tracking entry.
  pub fn place(
    order_code: String,
    user_id: Option<Uuid>,
    items: Vec<OrderItem>,
    customer_info: CustomerInfo,
    totals: OrderTotals,
    payment_method: PaymentMethod,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      order_code,
      user_id,
      items,
      customer_info,
      totals,
      status: OrderStatus::Pending,
      payment_status: PaymentStatus::Pending,
      payment_method,
      tracking_info: vec![TrackingEntry {
        status: OrderStatus::Pending,
        timestamp: now,
        note: Some(OrderStatus::Pending.label().to_string()),
      }],
      gateway_order_id: None,
      gateway_payment_id: None,
      gateway_signature: None,
      paid_at: None,
      delivered_at: None,
      notes: None,
      created_at: now,
      updated_at: now,
    }
  }

  /// Moves the order to `next`, appending to the tracking log.
  ///
  /// Moving to the current status is a no-op. Invalid moves are rejected
  /// and leave the order untouched.
  pub fn transition_to(&mut self, next: OrderStatus, note: Option<String>, now: DateTime<Utc>) -> Result<(), AppError> {
    if next == self.status {
      return Ok(());
    }
    if !self.status.can_transition_to(next) {
      return Err(AppError::InvalidTransition {
        from: self.status.to_string(),
        to: next.to_string(),
      });
    }
    self.status = next;
    if next == OrderStatus::Delivered {
      self.delivered_at = Some(now);
    }
    self.tracking_info.push(TrackingEntry {
      status: next,
      timestamp: now,
      note: note.or_else(|| Some(next.label().to_string())),
    });
    self.updated_at = now;
    Ok(())
  }

  /// Records a verified online payment and confirms the order.
  pub fn mark_paid(&mut self, payment_id: String, signature: String, now: DateTime<Utc>) -> Result<(), AppError> {
    if self.status == OrderStatus::Cancelled {
      return Err(AppError::Conflict(format!("Order {} has been cancelled", self.order_code)));
    }
    self.payment_status = PaymentStatus::Paid;
    self.payment_method = PaymentMethod::Online;
    self.gateway_payment_id = Some(payment_id);
    self.gateway_signature = Some(signature);
    self.paid_at = Some(now);
    if self.status == OrderStatus::Pending {
      self.transition_to(OrderStatus::Confirmed, Some("Payment received".to_string()), now)?;
    }
    self.updated_at = now;
    Ok(())
  }

  /// Confirms the order for payment at the door. Payment stays pending.
  pub fn confirm_cash_on_delivery(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
    if self.payment_status == PaymentStatus::Paid {
      return Err(AppError::Conflict(format!("Order {} is already paid", self.order_code)));
    }
    self.payment_method = PaymentMethod::CashOnDelivery;
    self.transition_to(
      OrderStatus::Confirmed,
      Some("Confirmed for cash on delivery".to_string()),
      now,
    )
  }

  /// One-line summary of the items, e.g. `Chocolate Truffle (1kg) x1, Red Velvet x2`.
  pub fn item_summary(&self) -> String {
    self
      .items
      .iter()
      .map(|item| match &item.weight {
        Some(weight) => format!("{} ({}) x{}", item.name, weight, item.quantity),
        None => format!("{} x{}", item.name, item.quantity),
      })
      .collect::<Vec<_>>()
      .join(", ")
  }

  pub fn contains_product(&self, product_id: Uuid) -> bool {
    self.items.iter().any(|item| item.product_id == Some(product_id))
  }

  pub fn tracking_view(&self) -> OrderTracking {
    OrderTracking {
      order_code: self.order_code.clone(),
      status: self.status,
      payment_status: self.payment_status,
      payment_method: self.payment_method,
      item_summary: self.item_summary(),
      total_amount: self.totals.total_amount,
      delivery_date: self.customer_info.delivery_date,
      time_slot: self.customer_info.time_slot.clone(),
      tracking_info: self.tracking_info.clone(),
      delivered_at: self.delivered_at,
      created_at: self.created_at,
    }
  }
}

/// What anyone holding an order code may see. Carries no contact or
/// address details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
  pub order_code: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub payment_method: PaymentMethod,
  pub item_summary: String,
  pub total_amount: i64,
  pub delivery_date: NaiveDate,
  pub time_slot: String,
  pub tracking_info: Vec<TrackingEntry>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

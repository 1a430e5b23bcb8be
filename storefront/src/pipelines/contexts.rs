// storefront/src/pipelines/contexts.rs

//! Context data of each flow. Handlers receive these wrapped in
//! `bakehouse_flow::ContextData`.

use crate::models::order::NewOrder;
use crate::models::{CustomerInfo, Order, OrderItem, OrderTotals, Otp, PaymentMethod, PhoneNumber, User};
use crate::services::payment_gateway::GatewayOrder;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Flows that end up holding one order.
pub trait OrderFlow {
  fn app_state(&self) -> &AppState;
  fn order(&self) -> Option<&Order>;
}

pub struct OtpRequestCtxData {
  pub app_state: AppState,
  pub raw_phone: String,
  pub now: DateTime<Utc>,
  pub phone: Option<PhoneNumber>,
  pub issued: Option<Otp>,
}

impl OtpRequestCtxData {
  pub fn new(app_state: AppState, raw_phone: String) -> Self {
    Self {
      app_state,
      raw_phone,
      now: Utc::now(),
      phone: None,
      issued: None,
    }
  }
}

pub struct OtpVerifyCtxData {
  pub app_state: AppState,
  pub raw_phone: String,
  pub code: String,
  pub name: Option<String>,
  pub now: DateTime<Utc>,
  pub phone: Option<PhoneNumber>,
  pub otp: Option<Otp>,
  pub user: Option<User>,
  pub is_new_user: bool,
  pub session_token: Option<String>,
}

impl OtpVerifyCtxData {
  pub fn new(app_state: AppState, raw_phone: String, code: String, name: Option<String>) -> Self {
    Self {
      app_state,
      raw_phone,
      code,
      name,
      now: Utc::now(),
      phone: None,
      otp: None,
      user: None,
      is_new_user: false,
      session_token: None,
    }
  }
}

pub struct OrderCreateCtxData {
  pub app_state: AppState,
  pub user_id: Option<Uuid>,
  pub request: NewOrder,
  pub now: DateTime<Utc>,
  pub items: Vec<OrderItem>,
  pub customer: Option<CustomerInfo>,
  pub payment_method: Option<PaymentMethod>,
  pub totals: Option<OrderTotals>,
  pub order_code: Option<String>,
  pub gateway_order: Option<GatewayOrder>,
  pub order: Option<Order>,
}

impl OrderCreateCtxData {
  pub fn new(app_state: AppState, user_id: Option<Uuid>, request: NewOrder) -> Self {
    Self {
      app_state,
      user_id,
      request,
      now: Utc::now(),
      items: Vec::new(),
      customer: None,
      payment_method: None,
      totals: None,
      order_code: None,
      gateway_order: None,
      order: None,
    }
  }

  pub fn is_cash_on_delivery(&self) -> bool {
    self.payment_method == Some(PaymentMethod::CashOnDelivery)
  }
}

/// Payment callback fields as posted by the checkout widget.
#[derive(Debug, Clone)]
pub struct PaymentProof {
  pub gateway_order_id: String,
  pub payment_id: String,
  pub signature: String,
}

pub struct PaymentVerifyCtxData {
  pub app_state: AppState,
  /// Order id or order code.
  pub order_ref: String,
  pub proof: PaymentProof,
  pub now: DateTime<Utc>,
  pub order: Option<Order>,
  pub already_paid: bool,
}

impl PaymentVerifyCtxData {
  pub fn new(app_state: AppState, order_ref: String, proof: PaymentProof) -> Self {
    Self {
      app_state,
      order_ref,
      proof,
      now: Utc::now(),
      order: None,
      already_paid: false,
    }
  }
}

impl OrderFlow for PaymentVerifyCtxData {
  fn app_state(&self) -> &AppState {
    &self.app_state
  }

  fn order(&self) -> Option<&Order> {
    self.order.as_ref()
  }
}

pub struct CodConfirmCtxData {
  pub app_state: AppState,
  pub order_ref: String,
  pub now: DateTime<Utc>,
  pub order: Option<Order>,
  pub already_confirmed: bool,
}

impl CodConfirmCtxData {
  pub fn new(app_state: AppState, order_ref: String) -> Self {
    Self {
      app_state,
      order_ref,
      now: Utc::now(),
      order: None,
      already_confirmed: false,
    }
  }
}

impl OrderFlow for CodConfirmCtxData {
  fn app_state(&self) -> &AppState {
    &self.app_state
  }

  fn order(&self) -> Option<&Order> {
    self.order.as_ref()
  }
}

// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use bakehouse_flow::{ContextData, PipelineResult};
use bakehouse_storefront::config::AppConfig;
use bakehouse_storefront::db::Stores;
use bakehouse_storefront::errors::AppError;
use bakehouse_storefront::models::order::NewOrder;
use bakehouse_storefront::models::Order;
use bakehouse_storefront::pipelines::contexts::{
  CodConfirmCtxData, OrderCreateCtxData, OtpRequestCtxData, OtpVerifyCtxData, PaymentProof, PaymentVerifyCtxData,
};
use bakehouse_storefront::services::messaging::{Messenger, TemplateMessage};
use bakehouse_storefront::services::payment_gateway::MockGateway;
use bakehouse_storefront::state::{default_rate_limiter, AppState, Integrations};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::Level;

pub const CUSTOMER_PHONE: &str = "9876543210";
pub const OTHER_PHONE: &str = "8123456789";

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMessenger {
  sent: Mutex<Vec<TemplateMessage>>,
}

impl RecordingMessenger {
  pub fn sent(&self) -> Vec<TemplateMessage> {
    self.sent.lock().clone()
  }

  pub fn count(&self, template: &str) -> usize {
    self.sent.lock().iter().filter(|m| m.template == template).count()
  }

  /// The code in the last OTP message sent to `phone`.
  pub fn last_code_for(&self, phone: &str) -> Option<String> {
    let recipient = format!("91{}", phone);
    self
      .sent
      .lock()
      .iter()
      .rev()
      .find(|m| m.template == "login_otp" && m.to == recipient)
      .and_then(|m| m.parameters.first().cloned())
  }
}

#[async_trait]
impl Messenger for RecordingMessenger {
  async fn send(&self, message: &TemplateMessage) -> Result<(), AppError> {
    self.sent.lock().push(message.clone());
    Ok(())
  }
}

/// A messaging provider that is always down.
pub struct FailingMessenger;

#[async_trait]
impl Messenger for FailingMessenger {
  async fn send(&self, _message: &TemplateMessage) -> Result<(), AppError> {
    Err(AppError::Delivery("provider unavailable".to_string()))
  }
}

pub struct TestApp {
  pub state: AppState,
  pub messenger: Arc<RecordingMessenger>,
}

pub fn test_app() -> TestApp {
  test_app_with(AppConfig::for_tests())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
  let messenger = Arc::new(RecordingMessenger::default());
  let state = state_with_messenger(config, messenger.clone());
  TestApp { state, messenger }
}

pub fn state_with_messenger(config: AppConfig, messenger: Arc<dyn Messenger>) -> AppState {
  let integrations = Integrations {
    messenger,
    gateway: Arc::new(MockGateway::new(config.gateway.currency.clone())),
    rate_limiter: default_rate_limiter(&config),
  };
  AppState::new(Arc::new(config), Stores::in_memory(), integrations)
}

// --- Flow shortcuts ---

pub async fn request_otp(state: &AppState, phone: &str) -> Result<PipelineResult, AppError> {
  let ctx = ContextData::new(OtpRequestCtxData::new(state.clone(), phone.to_string()));
  state.flows.run(ctx).await
}

pub fn verify_ctx(state: &AppState, phone: &str, code: &str) -> ContextData<OtpVerifyCtxData> {
  ContextData::new(OtpVerifyCtxData::new(
    state.clone(),
    phone.to_string(),
    code.to_string(),
    None,
  ))
}

pub async fn verify_otp(state: &AppState, phone: &str, code: &str) -> Result<ContextData<OtpVerifyCtxData>, AppError> {
  let ctx = verify_ctx(state, phone, code);
  state.flows.run(ctx.clone()).await?;
  Ok(ctx)
}

pub fn order_payload(payment_method: &str, price: i64, quantity: i64) -> Value {
  json!({
    "items": [{
      "id": null,
      "name": "Chocolate Truffle Cake",
      "price": price,
      "quantity": quantity,
      "weight": "1 kg",
    }],
    "customerInfo": {
      "name": "Asha Rao",
      "phone": CUSTOMER_PHONE,
      "address": "12 MG Road, Indiranagar",
      "city": "Bengaluru",
      "pincode": "560038",
      "deliveryDate": "2030-02-14",
      "timeSlot": "4 PM - 6 PM",
      "cakeMessage": "Happy Birthday",
    },
    "paymentMethod": payment_method,
  })
}

pub fn new_order(payload: Value) -> NewOrder {
  serde_json::from_value(payload).expect("order payload should deserialize")
}

pub async fn create_order(state: &AppState, payload: Value) -> Result<Order, AppError> {
  let ctx = ContextData::new(OrderCreateCtxData::new(state.clone(), None, new_order(payload)));
  state.flows.run(ctx.clone()).await?;
  let order = ctx.with(|c| c.order.clone());
  Ok(order.expect("completed order flow should hold the order"))
}

pub async fn verify_payment(
  state: &AppState,
  order_ref: &str,
  proof: PaymentProof,
) -> Result<ContextData<PaymentVerifyCtxData>, AppError> {
  let ctx = ContextData::new(PaymentVerifyCtxData::new(state.clone(), order_ref.to_string(), proof));
  state.flows.run(ctx.clone()).await?;
  Ok(ctx)
}

pub async fn confirm_cod(state: &AppState, order_ref: &str) -> Result<ContextData<CodConfirmCtxData>, AppError> {
  let ctx = ContextData::new(CodConfirmCtxData::new(state.clone(), order_ref.to_string()));
  state.flows.run(ctx.clone()).await?;
  Ok(ctx)
}

pub async fn stored_order(state: &AppState, order: &Order) -> Order {
  state
    .stores
    .orders
    .find_by_id(order.id)
    .await
    .expect("order lookup")
    .expect("order should be stored")
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

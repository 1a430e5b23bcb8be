// storefront/src/services/payment_gateway.rs

//! Razorpay order creation and payment signature checks.

use crate::config::GatewayConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// An order registered with the gateway. `amount` is in paise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  #[serde(default)]
  pub receipt: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Registers an order for `amount_rupees`, labelled with `receipt`.
  async fn create_order(&self, amount_rupees: i64, receipt: &str) -> Result<GatewayOrder, AppError>;

  /// Public key id handed to the checkout widget.
  fn public_key(&self) -> Option<String>;
}

pub fn to_paise(amount_rupees: i64) -> Result<i64, AppError> {
  amount_rupees
    .checked_mul(100)
    .ok_or_else(|| AppError::Validation("Order amount is too large".to_string()))
}

/// Checks the checkout signature: hex HMAC-SHA256 of `order_id|payment_id`
/// keyed with the gateway secret, compared in constant time.
pub fn verify_payment_signature(secret: &str, gateway_order_id: &str, payment_id: &str, signature: &str) -> Result<(), AppError> {
  let provided = hex::decode(signature.trim()).map_err(|_| {
    warn!("Payment signature is not valid hex.");
    AppError::SignatureMismatch
  })?;
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Config(format!("Invalid payment key secret: {}", e)))?;
  mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
  mac.verify_slice(&provided).map_err(|_| {
    warn!(gateway_order_id, "Payment signature mismatch.");
    AppError::SignatureMismatch
  })
}

/// Signature the gateway would produce; used by the mock checkout and tests.
pub fn sign_payment(secret: &str, gateway_order_id: &str, payment_id: &str) -> Result<String, AppError> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Config(format!("Invalid payment key secret: {}", e)))?;
  mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Razorpay REST client.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
  http: Client,
  api_base: String,
  key_id: String,
  key_secret: String,
  currency: String,
}

impl RazorpayClient {
  pub fn new(config: &GatewayConfig, key_id: String) -> Result<Self, AppError> {
    let http = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build payment HTTP client: {}", e)))?;
    Ok(Self {
      http,
      api_base: config.api_base.trim_end_matches('/').to_string(),
      key_id,
      key_secret: config.key_secret.clone(),
      currency: config.currency.clone(),
    })
  }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
  #[instrument(name = "razorpay::create_order", skip(self), err(Display))]
  async fn create_order(&self, amount_rupees: i64, receipt: &str) -> Result<GatewayOrder, AppError> {
    let body = json!({
      "amount": to_paise(amount_rupees)?,
      "currency": self.currency,
      "receipt": receipt,
      "notes": { "order_code": receipt },
    });

    let response = self
      .http
      .post(format!("{}/v1/orders", self.api_base))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&body)
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("Payment gateway request failed: {}", e)))?;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      error!(%status, body = %text, "Payment gateway rejected order creation.");
      return Err(AppError::Gateway(format!("Payment gateway returned {}", status)));
    }

    let order: GatewayOrder = response
      .json()
      .await
      .map_err(|e| AppError::Gateway(format!("Unexpected payment gateway response: {}", e)))?;
    info!(gateway_order_id = %order.id, "Gateway order created.");
    Ok(order)
  }

  fn public_key(&self) -> Option<String> {
    Some(self.key_id.clone())
  }
}

/// Local stand-in used when no gateway key is configured. Issues
/// `order_mock_*` ids and never leaves the process.
#[derive(Debug, Clone)]
pub struct MockGateway {
  currency: String,
}

impl MockGateway {
  pub fn new(currency: impl Into<String>) -> Self {
    Self { currency: currency.into() }
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  async fn create_order(&self, amount_rupees: i64, receipt: &str) -> Result<GatewayOrder, AppError> {
    let order = GatewayOrder {
      id: format!("order_mock_{}", Uuid::new_v4().simple()),
      amount: to_paise(amount_rupees)?,
      currency: self.currency.clone(),
      receipt: Some(receipt.to_string()),
    };
    info!(gateway_order_id = %order.id, "Mock gateway order created.");
    Ok(order)
  }

  fn public_key(&self) -> Option<String> {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "rzp_test_secret";

  #[test]
  fn valid_signature_verifies() {
    let signature = sign_payment(SECRET, "order_abc", "pay_xyz").unwrap();

    assert!(verify_payment_signature(SECRET, "order_abc", "pay_xyz", &signature).is_ok());
  }

  #[test]
  fn every_single_character_mutation_is_rejected() {
    let signature = sign_payment(SECRET, "order_abc", "pay_xyz").unwrap();

    for idx in 0..signature.len() {
      let mut mutated: Vec<char> = signature.chars().collect();
      mutated[idx] = if mutated[idx] == 'a' { 'b' } else { 'a' };
      let mutated: String = mutated.into_iter().collect();
      assert!(matches!(
        verify_payment_signature(SECRET, "order_abc", "pay_xyz", &mutated),
        Err(AppError::SignatureMismatch)
      ));
    }
  }

  #[test]
  fn signature_is_bound_to_ids_and_secret() {
    let signature = sign_payment(SECRET, "order_abc", "pay_xyz").unwrap();

    assert!(verify_payment_signature(SECRET, "order_abc", "pay_other", &signature).is_err());
    assert!(verify_payment_signature("other_secret", "order_abc", "pay_xyz", &signature).is_err());
    assert!(verify_payment_signature(SECRET, "order_abc", "pay_xyz", "not-hex").is_err());
  }

  #[tokio::test]
  async fn mock_gateway_amounts_are_in_paise() {
    let order = MockGateway::new("INR").create_order(750, "ORD-250101-00001").await.unwrap();

    assert!(order.id.starts_with("order_mock_"));
    assert_eq!(order.amount, 75_000);
  }
}

// tests/order_flow_tests.rs
mod common;

use bakehouse_storefront::config::AppConfig;
use bakehouse_storefront::errors::AppError;
use bakehouse_storefront::models::{OrderStatus, PaymentMethod, PaymentStatus};
use bakehouse_storefront::pipelines::contexts::PaymentProof;
use bakehouse_storefront::services::payment_gateway::sign_payment;
use common::*;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;

const SECRET: &str = "rzp_test_secret";

fn proof_for(gateway_order_id: &str, payment_id: &str) -> PaymentProof {
  PaymentProof {
    gateway_order_id: gateway_order_id.to_string(),
    payment_id: payment_id.to_string(),
    signature: sign_payment(SECRET, gateway_order_id, payment_id).unwrap(),
  }
}

fn flip_hex_char(signature: &str, idx: usize) -> String {
  signature
    .char_indices()
    .map(|(i, c)| if i == idx { if c == '0' { '1' } else { '0' } } else { c })
    .collect()
}

#[tokio::test]
#[serial]
async fn online_order_is_registered_with_the_gateway() {
  setup_tracing();
  let app = test_app();

  let order = create_order(&app.state, order_payload("razorpay", 600, 2)).await.unwrap();

  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.payment_method, PaymentMethod::Online);
  assert_eq!(order.totals.subtotal, 1200);
  assert_eq!(order.totals.total_amount, 1200);
  assert!(order.order_code.starts_with("ORD-"));
  assert!(order.gateway_order_id.as_deref().is_some_and(|id| id.starts_with("order_mock_")));
  assert_eq!(order.tracking_info.len(), 1);
  assert_eq!(stored_order(&app.state, &order).await, order);
  assert!(app.messenger.sent().is_empty());
}

#[tokio::test]
#[serial]
async fn invalid_orders_are_rejected_and_nothing_is_saved() {
  setup_tracing();
  let app = test_app();

  let mut no_items = order_payload("online", 500, 1);
  no_items["items"] = json!([]);
  let mut short_phone = order_payload("online", 500, 1);
  short_phone["customerInfo"]["phone"] = json!("12345");
  let mut no_address = order_payload("online", 500, 1);
  no_address["customerInfo"]
    .as_object_mut()
    .unwrap()
    .remove("address");
  let mut zero_quantity = order_payload("cod", 500, 0);
  zero_quantity["paymentMethod"] = json!("cod");
  let mut wrong_total = order_payload("online", 500, 1);
  wrong_total["totalAmount"] = json!(1);
  let mut unknown_method = order_payload("online", 500, 1);
  unknown_method["paymentMethod"] = json!("barter");

  for payload in [no_items, short_phone, no_address, zero_quantity, wrong_total, unknown_method] {
    let result = create_order(&app.state, payload.clone()).await;
    assert!(matches!(result, Err(AppError::Validation(_))), "{:?} for {}", result, payload);
  }

  let saved = app.state.stores.orders.list(None, 50, 0).await.unwrap();
  assert!(saved.is_empty());
}

#[tokio::test]
#[serial]
async fn oversized_line_amounts_are_rejected_instead_of_wrapping() {
  setup_tracing();
  let app = test_app();

  let mut wrapping = order_payload("cod", 1 << 62, 4);
  wrapping["items"]
    .as_array_mut()
    .unwrap()
    .push(json!({ "name": "Vanilla Cupcake", "price": 500, "quantity": 1 }));
  wrapping["totalAmount"] = json!(500);
  let huge_quantity = order_payload("online", 500, i64::from(i32::MAX));

  for payload in [wrapping, huge_quantity] {
    let result = create_order(&app.state, payload.clone()).await;
    assert!(matches!(result, Err(AppError::Validation(_))), "{:?} for {}", result, payload);
  }

  let saved = app.state.stores.orders.list(None, 50, 0).await.unwrap();
  assert!(saved.is_empty());
}

#[tokio::test]
#[serial]
async fn delivery_charge_and_discount_are_applied_server_side() {
  setup_tracing();
  let mut config = AppConfig::for_tests();
  config.delivery_charge = 50;
  config.free_delivery_threshold = 1000;
  let app = test_app_with(config);

  let mut small = order_payload("cod", 400, 1);
  small["totalAmount"] = json!(450);
  let small = create_order(&app.state, small).await.unwrap();
  assert_eq!(small.totals.delivery_charge, 50);
  assert_eq!(small.totals.total_amount, 450);

  let mut large = order_payload("cod", 600, 2);
  large["discount"] = json!(200);
  let large = create_order(&app.state, large).await.unwrap();
  assert_eq!(large.totals.delivery_charge, 0);
  assert_eq!(large.totals.discount, 200);
  assert_eq!(large.totals.total_amount, 1000);
}

#[tokio::test]
#[serial]
async fn cash_on_delivery_order_of_750_confirms_without_payment() {
  setup_tracing();
  let app = test_app();

  let order = create_order(&app.state, order_payload("cod", 750, 1)).await.unwrap();
  assert_eq!(order.totals.total_amount, 750);
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.payment_method, PaymentMethod::CashOnDelivery);
  assert!(order.gateway_order_id.is_none());

  let ctx = confirm_cod(&app.state, &order.order_code).await.unwrap();
  assert!(!ctx.read().already_confirmed);

  let confirmed = stored_order(&app.state, &order).await;
  assert_eq!(confirmed.status, OrderStatus::Confirmed);
  assert_eq!(confirmed.payment_status, PaymentStatus::Pending);
  assert_eq!(confirmed.payment_method, PaymentMethod::CashOnDelivery);
  assert_eq!(confirmed.tracking_info.len(), 2);

  assert_eq!(app.messenger.count("order_confirmation"), 1);
  assert_eq!(app.messenger.count("new_order_alert"), 1);
  let alert = app
    .messenger
    .sent()
    .into_iter()
    .find(|m| m.template == "new_order_alert")
    .unwrap();
  assert_eq!(alert.to, "919123456780");
  assert!(alert.parameters.contains(&"₹750".to_string()));
  assert!(alert.parameters.contains(&"Cash on delivery".to_string()));

  let again = confirm_cod(&app.state, &order.id.to_string()).await.unwrap();
  assert!(again.read().already_confirmed);
  assert_eq!(app.messenger.count("order_confirmation"), 1);
}

#[tokio::test]
#[serial]
async fn valid_signature_marks_the_order_paid_once() {
  setup_tracing();
  let app = test_app();
  let order = create_order(&app.state, order_payload("online", 900, 1)).await.unwrap();
  let gateway_order_id = order.gateway_order_id.clone().unwrap();

  let ctx = verify_payment(&app.state, &order.id.to_string(), proof_for(&gateway_order_id, "pay_123"))
    .await
    .unwrap();
  assert!(!ctx.read().already_paid);

  let paid = stored_order(&app.state, &order).await;
  assert_eq!(paid.payment_status, PaymentStatus::Paid);
  assert_eq!(paid.status, OrderStatus::Confirmed);
  assert_eq!(paid.gateway_payment_id.as_deref(), Some("pay_123"));
  assert!(paid.paid_at.is_some());
  assert_eq!(app.messenger.count("order_confirmation"), 1);
  assert_eq!(app.messenger.count("new_order_alert"), 1);

  let again = verify_payment(&app.state, &order.order_code, proof_for(&gateway_order_id, "pay_123"))
    .await
    .unwrap();
  assert!(again.read().already_paid);
  assert_eq!(app.messenger.count("order_confirmation"), 1);

  let other_payment = verify_payment(&app.state, &order.order_code, proof_for(&gateway_order_id, "pay_999")).await;
  assert!(matches!(other_payment, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[serial]
async fn any_single_character_change_to_the_signature_is_rejected() {
  setup_tracing();
  let app = test_app();
  let order = create_order(&app.state, order_payload("online", 900, 1)).await.unwrap();
  let gateway_order_id = order.gateway_order_id.clone().unwrap();
  let genuine = proof_for(&gateway_order_id, "pay_123");

  for idx in 0..genuine.signature.len() {
    let forged = PaymentProof {
      signature: flip_hex_char(&genuine.signature, idx),
      ..genuine.clone()
    };
    let result = verify_payment(&app.state, &order.order_code, forged).await;
    assert!(matches!(result, Err(AppError::SignatureMismatch)), "position {}", idx);
  }

  let untouched = stored_order(&app.state, &order).await;
  assert_eq!(untouched.payment_status, PaymentStatus::Pending);
  assert_eq!(untouched.status, OrderStatus::Pending);
  assert!(app.messenger.sent().is_empty());
}

#[tokio::test]
#[serial]
async fn payment_for_another_gateway_order_is_rejected() {
  setup_tracing();
  let app = test_app();
  let order = create_order(&app.state, order_payload("online", 900, 1)).await.unwrap();

  let result = verify_payment(&app.state, &order.order_code, proof_for("order_someone_else", "pay_1")).await;

  assert!(matches!(result, Err(AppError::Validation(_))));
  assert_eq!(stored_order(&app.state, &order).await.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
#[serial]
async fn notification_failures_do_not_undo_the_payment() {
  setup_tracing();
  let state = state_with_messenger(AppConfig::for_tests(), Arc::new(FailingMessenger));
  let order = create_order(&state, order_payload("online", 900, 1)).await.unwrap();
  let gateway_order_id = order.gateway_order_id.clone().unwrap();

  let result = verify_payment(&state, &order.order_code, proof_for(&gateway_order_id, "pay_123")).await;

  assert!(result.is_ok());
  assert_eq!(stored_order(&state, &order).await.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
#[serial]
async fn unknown_order_is_not_found() {
  setup_tracing();
  let app = test_app();

  let result = confirm_cod(&app.state, "ORD-000000-00000").await;

  assert!(matches!(result, Err(AppError::NotFound(_))));
}

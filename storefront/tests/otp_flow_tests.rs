// tests/otp_flow_tests.rs
mod common;

use bakehouse_flow::{ContextData, PipelineResult};
use bakehouse_storefront::config::AppConfig;
use bakehouse_storefront::errors::AppError;
use bakehouse_storefront::pipelines::contexts::OtpRequestCtxData;
use chrono::Duration;
use common::*;
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn correct_code_signs_in_exactly_once() {
  setup_tracing();
  let app = test_app();

  assert_eq!(request_otp(&app.state, CUSTOMER_PHONE).await.unwrap(), PipelineResult::Completed);
  let code = app.messenger.last_code_for(CUSTOMER_PHONE).expect("OTP should be sent");
  assert_eq!(code.len(), 6);

  let ctx = verify_otp(&app.state, CUSTOMER_PHONE, &code).await.unwrap();
  let (user, token, is_new_user) = ctx.with(|c| (c.user.clone(), c.session_token.clone(), c.is_new_user));
  let user = user.expect("user should be created");
  assert_eq!(user.phone, CUSTOMER_PHONE);
  assert!(user.is_verified);
  assert!(is_new_user);
  assert!(token.is_some());

  let second = verify_otp(&app.state, CUSTOMER_PHONE, &code).await;
  assert!(matches!(second, Err(AppError::OtpAlreadyUsed)));
}

#[tokio::test]
#[serial]
async fn accepts_formatted_phone_numbers() {
  setup_tracing();
  let app = test_app();

  request_otp(&app.state, "+91 98765-43210").await.unwrap();
  let code = app.messenger.last_code_for(CUSTOMER_PHONE).expect("OTP should be sent");

  assert!(verify_otp(&app.state, "09876543210", &code).await.is_ok());
}

#[tokio::test]
#[serial]
async fn returning_customer_keeps_the_same_account() {
  setup_tracing();
  let app = test_app();

  request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  let code = app.messenger.last_code_for(CUSTOMER_PHONE).unwrap();
  let first = verify_otp(&app.state, CUSTOMER_PHONE, &code).await.unwrap();
  let first_id = first.with(|c| c.user.as_ref().map(|u| u.id)).unwrap();

  request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  let code = app.messenger.last_code_for(CUSTOMER_PHONE).unwrap();
  let second = verify_otp(&app.state, CUSTOMER_PHONE, &code).await.unwrap();

  assert_eq!(second.with(|c| c.user.as_ref().map(|u| u.id)), Some(first_id));
  assert!(!second.read().is_new_user);
}

#[tokio::test]
#[serial]
async fn expired_code_is_rejected_even_when_correct() {
  setup_tracing();
  let app = test_app();
  request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  let code = app.messenger.last_code_for(CUSTOMER_PHONE).unwrap();

  let ctx = verify_ctx(&app.state, CUSTOMER_PHONE, &code);
  ctx.update(|c| c.now = c.now + Duration::minutes(11));
  let result = app.state.flows.run(ctx).await;

  assert!(matches!(result, Err(AppError::OtpExpired)));
}

#[tokio::test]
#[serial]
async fn third_wrong_code_exhausts_and_a_fresh_request_resets() {
  setup_tracing();
  let app = test_app();
  request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  let code = app.messenger.last_code_for(CUSTOMER_PHONE).unwrap();

  // Generated codes are never below 100000.
  let wrong = "000000";
  assert!(matches!(
    verify_otp(&app.state, CUSTOMER_PHONE, wrong).await,
    Err(AppError::OtpMismatch { attempts_remaining: 2 })
  ));
  assert!(matches!(
    verify_otp(&app.state, CUSTOMER_PHONE, wrong).await,
    Err(AppError::OtpMismatch { attempts_remaining: 1 })
  ));
  assert!(matches!(
    verify_otp(&app.state, CUSTOMER_PHONE, wrong).await,
    Err(AppError::OtpExhausted)
  ));
  assert!(matches!(
    verify_otp(&app.state, CUSTOMER_PHONE, &code).await,
    Err(AppError::OtpExhausted)
  ));

  request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  let fresh = app.messenger.last_code_for(CUSTOMER_PHONE).unwrap();
  let stored = app.state.stores.otps.latest_for_phone(CUSTOMER_PHONE).await.unwrap().unwrap();
  assert_eq!(stored.attempts, 0);

  assert!(verify_otp(&app.state, CUSTOMER_PHONE, &fresh).await.is_ok());
}

#[tokio::test]
#[serial]
async fn new_request_supersedes_the_previous_code() {
  setup_tracing();
  let app = test_app();
  request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  let old = app.messenger.last_code_for(CUSTOMER_PHONE).unwrap();
  request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  let new = app.messenger.last_code_for(CUSTOMER_PHONE).unwrap();

  if old != new {
    assert!(matches!(
      verify_otp(&app.state, CUSTOMER_PHONE, &old).await,
      Err(AppError::OtpMismatch { .. })
    ));
  }
  assert!(verify_otp(&app.state, CUSTOMER_PHONE, &new).await.is_ok());
}

#[tokio::test]
#[serial]
async fn rate_limit_is_per_phone_and_lifts_when_the_window_rolls() {
  setup_tracing();
  let app = test_app();

  for _ in 0..3 {
    request_otp(&app.state, CUSTOMER_PHONE).await.unwrap();
  }
  match request_otp(&app.state, CUSTOMER_PHONE).await {
    Err(AppError::RateLimited { retry_after_secs }) => {
      assert!(retry_after_secs > 0 && retry_after_secs <= 600, "got {}", retry_after_secs);
    }
    other => panic!("expected RateLimited, got {:?}", other),
  }
  assert_eq!(app.messenger.count("login_otp"), 3);

  assert!(request_otp(&app.state, OTHER_PHONE).await.is_ok());

  let later = ContextData::new(OtpRequestCtxData::new(app.state.clone(), CUSTOMER_PHONE.to_string()));
  later.update(|c| c.now = c.now + Duration::minutes(11));
  assert_eq!(app.state.flows.run(later).await.unwrap(), PipelineResult::Completed);
}

#[tokio::test]
#[serial]
async fn invalid_phone_is_a_validation_error() {
  setup_tracing();
  let app = test_app();

  for raw in ["12345", "5876543210", "98765abcde", ""] {
    let result = request_otp(&app.state, raw).await;
    assert!(matches!(result, Err(AppError::Validation(_))), "{:?} for {:?}", result, raw);
  }
  assert!(app.messenger.sent().is_empty());
}

#[tokio::test]
#[serial]
async fn failed_delivery_discards_the_code() {
  setup_tracing();
  let state = state_with_messenger(AppConfig::for_tests(), Arc::new(FailingMessenger));

  let result = request_otp(&state, CUSTOMER_PHONE).await;

  assert!(matches!(result, Err(AppError::Delivery(_))));
  assert!(state.stores.otps.latest_for_phone(CUSTOMER_PHONE).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn verify_without_a_request_is_not_found() {
  setup_tracing();
  let app = test_app();

  let result = verify_otp(&app.state, CUSTOMER_PHONE, "123456").await;

  assert!(matches!(result, Err(AppError::NotFound(_))));
}

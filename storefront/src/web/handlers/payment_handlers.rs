// storefront/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::{CodConfirmCtxData, PaymentProof, PaymentVerifyCtxData};
use crate::state::AppState;
use bakehouse_flow::{ContextData, PipelineResult};

/// Fields posted back by the Razorpay checkout widget, plus our order id.
#[derive(Deserialize, Debug)]
pub struct VerifyPaymentPayload {
  pub razorpay_order_id: String,
  pub razorpay_payment_id: String,
  pub razorpay_signature: String,
  #[serde(alias = "orderId")]
  pub backend_order_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CodPayload {
  #[serde(alias = "orderCode")]
  pub order_id: String,
}

#[instrument(name = "handler::verify_payment", skip_all, fields(order_ref = %req_payload.backend_order_id))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<VerifyPaymentPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let proof = PaymentProof {
    gateway_order_id: payload.razorpay_order_id,
    payment_id: payload.razorpay_payment_id,
    signature: payload.razorpay_signature,
  };
  let ctx = ContextData::new(PaymentVerifyCtxData::new(
    app_state.get_ref().clone(),
    payload.backend_order_id,
    proof,
  ));

  let result = app_state.flows.run(ctx.clone()).await?;
  let (order, already_paid) = ctx.with(|c| (c.order.clone(), c.already_paid));
  let order = order.ok_or_else(|| AppError::Internal("Payment flow finished without an order.".to_string()))?;
  if result == PipelineResult::Stopped && !already_paid {
    return Err(AppError::Internal("Payment verification was halted by an internal step.".to_string()));
  }

  info!(order_code = %order.order_code, already_paid, "Payment verified.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Payment verified successfully",
    "alreadyVerified": already_paid,
    "order": order.tracking_view(),
  })))
}

#[instrument(name = "handler::confirm_cod", skip_all, fields(order_ref = %req_payload.order_id))]
pub async fn confirm_cod_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CodPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(CodConfirmCtxData::new(
    app_state.get_ref().clone(),
    req_payload.into_inner().order_id,
  ));

  let result = app_state.flows.run(ctx.clone()).await?;
  let (order, already_confirmed) = ctx.with(|c| (c.order.clone(), c.already_confirmed));
  let order = order.ok_or_else(|| AppError::Internal("COD flow finished without an order.".to_string()))?;
  if result == PipelineResult::Stopped && !already_confirmed {
    return Err(AppError::Internal("COD confirmation was halted by an internal step.".to_string()));
  }

  info!(order_code = %order.order_code, already_confirmed, "Cash-on-delivery order confirmed.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order confirmed. Please pay on delivery.",
    "order": order.tracking_view(),
  })))
}

// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::order::NewOrder;
use crate::models::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::pipelines::common_steps::find_order;
use crate::pipelines::contexts::OrderCreateCtxData;
use crate::state::AppState;
use crate::web::extractors::{AdminSession, OptionalUser};
use bakehouse_flow::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatePayload {
  pub status: Option<String>,
  pub payment_status: Option<PaymentStatus>,
  pub notes: Option<String>,
}

#[instrument(name = "handler::create_order", skip_all, fields(signed_in = session.0.is_some()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  session: OptionalUser,
  req_payload: web::Json<NewOrder>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(OrderCreateCtxData::new(
    app_state.get_ref().clone(),
    session.0,
    req_payload.into_inner(),
  ));

  if app_state.flows.run(ctx.clone()).await? == PipelineResult::Stopped {
    warn!("Order creation flow stopped before the order was saved.");
    return Err(AppError::Internal("Order creation was halted by an internal step.".to_string()));
  }

  let (order, gateway_order) = ctx.with(|c| (c.order.clone(), c.gateway_order.clone()));
  let order = order.ok_or_else(|| AppError::Internal("Order flow completed without an order.".to_string()))?;
  info!(order_code = %order.order_code, "Order created.");

  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "order": order,
    "orderId": order.id,
    "orderCode": order.order_code,
    "razorpayOrderId": gateway_order.as_ref().map(|g| g.id.clone()),
    "amount": gateway_order.as_ref().map(|g| g.amount),
    "currency": gateway_order.as_ref().map(|g| g.currency.clone()),
    "keyId": gateway_order.as_ref().and(app_state.gateway.public_key()),
  })))
}

/// Public order tracking by order code. Only the customer who placed the
/// order sees the delivery details.
#[instrument(name = "handler::track_order", skip(app_state))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  session: OptionalUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order = find_order(&app_state, &path).await?;
  let is_owner = session.0.is_some() && session.0 == order.user_id;
  if is_owner {
    return Ok(HttpResponse::Ok().json(json!({ "order": order })));
  }
  Ok(HttpResponse::Ok().json(json!({ "order": order.tracking_view() })))
}

#[instrument(name = "handler::update_order", skip(app_state, req_payload))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
  path: web::Path<String>,
  req_payload: web::Json<OrderUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let mut order = find_order(&app_state, &path).await?;
  let loaded_at = order.updated_at;
  let now = Utc::now();
  let notes = payload.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

  if let Some(raw) = payload.status.as_deref() {
    let next: OrderStatus = raw.parse()?;
    order.transition_to(next, notes.clone(), now)?;
  }
  if let Some(payment_status) = payload.payment_status {
    let newly_paid = payment_status == PaymentStatus::Paid && order.payment_status != PaymentStatus::Paid;
    if newly_paid && order.payment_method != PaymentMethod::CashOnDelivery {
      warn!(order_code = %order.order_code, "Admin tried to mark an online order paid.");
      return Err(AppError::Conflict(
        "Online orders are marked paid only by a verified payment".to_string(),
      ));
    }
    if payment_status == PaymentStatus::Paid && order.paid_at.is_none() {
      order.paid_at = Some(now);
    }
    order.payment_status = payment_status;
  }
  if notes.is_some() {
    order.notes = notes;
  }
  order.updated_at = now;

  app_state.stores.orders.update(&order, loaded_at).await?;
  info!(
    order_code = %order.order_code,
    status = order.status.as_str(),
    payment_status = order.payment_status.as_str(),
    "Order updated by admin."
  );
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

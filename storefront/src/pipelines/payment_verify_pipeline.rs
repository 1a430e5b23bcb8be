// storefront/src/pipelines/payment_verify_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::PaymentStatus;
use crate::pipelines::common_steps::{self, find_order};
use crate::pipelines::contexts::PaymentVerifyCtxData;
use crate::services::payment_gateway::verify_payment_signature;
use bakehouse_flow::{ContextData, Pipeline, PipelineControl, Workflows};
use tracing::{info, instrument, warn};

/// Reloads allowed when the order changes between load and save.
const SAVE_ATTEMPTS: usize = 3;

pub fn build_payment_verify_pipeline() -> Pipeline<PaymentVerifyCtxData, AppError> {
  let mut p = Pipeline::<PaymentVerifyCtxData, AppError>::new(
    "payment_verify",
    &[
      ("validate_input", false),
      ("load_order", false),
      ("verify_signature", false),
      ("check_already_paid", false),
      ("record_payment", false),
      ("notify_customer", true),
      ("notify_owner", true),
    ],
  );

  p.on("validate_input", |ctx: ContextData<PaymentVerifyCtxData>| async move {
    ctx.with(|c| {
      let proof = &c.proof;
      if [&proof.gateway_order_id, &proof.payment_id, &proof.signature]
        .iter()
        .any(|v| v.trim().is_empty())
      {
        return Err(AppError::Validation("Missing payment verification fields".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on("load_order", |ctx: ContextData<PaymentVerifyCtxData>| async move {
    let (app_state, order_ref) = ctx.with(|c| (c.app_state.clone(), c.order_ref.clone()));
    let order = find_order(&app_state, &order_ref).await?;
    ctx.write().order = Some(order);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("verify_signature", verify_signature);
  p.on("check_already_paid", check_already_paid);
  p.on("record_payment", record_payment);
  p.on("notify_customer", common_steps::notify_customer::<PaymentVerifyCtxData>);
  p.on("notify_owner", common_steps::notify_owner::<PaymentVerifyCtxData>);
  p
}

pub fn register_payment_verify_pipeline(flows: &Workflows<AppError>) {
  flows.register(build_payment_verify_pipeline());
  info!("Payment verification flow registered.");
}

/// The order is left untouched unless the signature checks out and belongs
/// to the gateway order recorded for it.
#[instrument(name = "payment_verify::verify_signature", skip_all, err(Display))]
async fn verify_signature(ctx: ContextData<PaymentVerifyCtxData>) -> AppResult<PipelineControl> {
  ctx.with(|c| {
    let order = c
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order missing from payment context".to_string()))?;
    if let Some(expected) = &order.gateway_order_id {
      if expected != c.proof.gateway_order_id.trim() {
        warn!(order_code = %order.order_code, "Payment is for a different gateway order.");
        return Err(AppError::Validation("Payment does not belong to this order".to_string()));
      }
    }
    verify_payment_signature(
      &c.app_state.config.gateway.key_secret,
      c.proof.gateway_order_id.trim(),
      c.proof.payment_id.trim(),
      &c.proof.signature,
    )?;
    Ok(PipelineControl::Continue)
  })
}

/// Re-verification of a paid order with the same payment is a no-op
/// success and stops before any notification goes out again.
async fn check_already_paid(ctx: ContextData<PaymentVerifyCtxData>) -> AppResult<PipelineControl> {
  let control = ctx.with(|c| {
    let Some(order) = c.order.as_ref() else {
      return Err(AppError::Internal("Order missing from payment context".to_string()));
    };
    if order.payment_status != PaymentStatus::Paid {
      return Ok(PipelineControl::Continue);
    }
    if order.gateway_payment_id.as_deref() == Some(c.proof.payment_id.trim()) {
      info!(order_code = %order.order_code, "Payment already recorded.");
      return Ok(PipelineControl::Stop);
    }
    Err(AppError::Conflict(format!("Order {} is already paid", order.order_code)))
  })?;
  if control == PipelineControl::Stop {
    ctx.write().already_paid = true;
  }
  Ok(control)
}

#[instrument(name = "payment_verify::record_payment", skip_all, err(Display))]
async fn record_payment(ctx: ContextData<PaymentVerifyCtxData>) -> AppResult<PipelineControl> {
  let (stores, mut order, proof, now) = ctx.with(|c| {
    let order = c
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Order missing from payment context".to_string()))?;
    Ok::<_, AppError>((c.app_state.stores.clone(), order, c.proof.clone(), c.now))
  })?;

  let payment_id = proof.payment_id.trim().to_string();
  for attempt in 1..=SAVE_ATTEMPTS {
    let loaded_at = order.updated_at;
    order.mark_paid(payment_id.clone(), proof.signature.trim().to_string(), now)?;
    match stores.orders.update(&order, loaded_at).await {
      Ok(()) => {
        info!(order_code = %order.order_code, "Payment verified and recorded.");
        ctx.write().order = Some(order);
        return Ok(PipelineControl::Continue);
      }
      Err(AppError::Conflict(_)) if attempt < SAVE_ATTEMPTS => {
        warn!(order_code = %order.order_code, attempt, "Order changed while recording payment, reloading.");
        order = stores
          .orders
          .find_by_id(order.id)
          .await?
          .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        if order.payment_status == PaymentStatus::Paid {
          let same_payment = order.gateway_payment_id.as_deref() == Some(payment_id.as_str());
          let order_code = order.order_code.clone();
          let mut data = ctx.write();
          data.order = Some(order);
          if same_payment {
            data.already_paid = true;
            return Ok(PipelineControl::Stop);
          }
          return Err(AppError::Conflict(format!("Order {} is already paid", order_code)));
        }
      }
      Err(err) => return Err(err),
    }
  }
  Err(AppError::Conflict("Order kept changing while recording the payment".to_string()))
}

// storefront/src/pipelines/cod_confirm_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderStatus, PaymentMethod};
use crate::pipelines::common_steps::{self, find_order};
use crate::pipelines::contexts::CodConfirmCtxData;
use bakehouse_flow::{ContextData, Pipeline, PipelineControl, Workflows};
use tracing::{info, instrument};

pub fn build_cod_confirm_pipeline() -> Pipeline<CodConfirmCtxData, AppError> {
  let mut p = Pipeline::<CodConfirmCtxData, AppError>::new(
    "cod_confirm",
    &[
      ("load_order", false),
      ("confirm_order", false),
      ("notify_customer", true),
      ("notify_owner", true),
    ],
  );

  p.on("load_order", |ctx: ContextData<CodConfirmCtxData>| async move {
    let (app_state, order_ref) = ctx.with(|c| (c.app_state.clone(), c.order_ref.clone()));
    let order = find_order(&app_state, &order_ref).await?;
    ctx.write().order = Some(order);
    Ok::<_, AppError>(PipelineControl::Continue)
  });
  p.on("confirm_order", confirm_order);
  p.on("notify_customer", common_steps::notify_customer::<CodConfirmCtxData>);
  p.on("notify_owner", common_steps::notify_owner::<CodConfirmCtxData>);
  p
}

pub fn register_cod_confirm_pipeline(flows: &Workflows<AppError>) {
  flows.register(build_cod_confirm_pipeline());
  info!("Cash-on-delivery confirmation flow registered.");
}

/// Confirming an order that is already confirmed for cash on delivery is a
/// no-op and sends nothing.
#[instrument(name = "cod_confirm::confirm_order", skip_all, err(Display))]
async fn confirm_order(ctx: ContextData<CodConfirmCtxData>) -> AppResult<PipelineControl> {
  let (stores, mut order, now) = ctx.with(|c| {
    let order = c
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Order missing from confirmation context".to_string()))?;
    Ok::<_, AppError>((c.app_state.stores.clone(), order, c.now))
  })?;

  if order.status == OrderStatus::Confirmed && order.payment_method == PaymentMethod::CashOnDelivery {
    info!(order_code = %order.order_code, "Order already confirmed for cash on delivery.");
    ctx.write().already_confirmed = true;
    return Ok(PipelineControl::Stop);
  }

  let loaded_at = order.updated_at;
  order.confirm_cash_on_delivery(now)?;
  stores.orders.update(&order, loaded_at).await?;
  info!(order_code = %order.order_code, "Order confirmed for cash on delivery.");
  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

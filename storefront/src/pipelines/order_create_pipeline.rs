// storefront/src/pipelines/order_create_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::order::{validate_customer, validate_items};
use crate::models::{Order, OrderTotals, PaymentMethod};
use crate::pipelines::contexts::OrderCreateCtxData;
use crate::services::order_code::allocate_order_code;
use bakehouse_flow::{ContextData, Pipeline, PipelineControl, Workflows};
use tracing::{info, instrument, warn};

pub fn build_order_create_pipeline() -> Pipeline<OrderCreateCtxData, AppError> {
  let mut p = Pipeline::<OrderCreateCtxData, AppError>::new(
    "order_create",
    &[
      ("validate_items", false),
      ("validate_customer", false),
      ("resolve_payment_method", false),
      ("compute_totals", false),
      ("assign_order_code", false),
      ("create_gateway_order", false),
      ("persist_order", false),
    ],
  );

  p.on("validate_items", |ctx: ContextData<OrderCreateCtxData>| async move {
    let items = ctx.with(|c| validate_items(&c.request.items))?;
    ctx.write().items = items;
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("validate_customer", |ctx: ContextData<OrderCreateCtxData>| async move {
    let customer = ctx.with(|c| validate_customer(&c.request.customer_info))?;
    ctx.write().customer = Some(customer);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("resolve_payment_method", |ctx: ContextData<OrderCreateCtxData>| async move {
    let method = ctx.with(|c| match c.request.payment_method.as_deref() {
      Some(raw) => raw.parse::<PaymentMethod>(),
      None => Ok(PaymentMethod::Online),
    })?;
    ctx.write().payment_method = Some(method);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("compute_totals", compute_totals);
  p.on("assign_order_code", assign_order_code);

  p.skip_step_if("create_gateway_order", OrderCreateCtxData::is_cash_on_delivery);
  p.on("create_gateway_order", create_gateway_order);

  p.on("persist_order", persist_order);
  p
}

pub fn register_order_create_pipeline(flows: &Workflows<AppError>) {
  flows.register(build_order_create_pipeline());
  info!("Order creation flow registered.");
}

/// Totals are always recomputed here; a client total that disagrees is
/// rejected rather than trusted.
async fn compute_totals(ctx: ContextData<OrderCreateCtxData>) -> AppResult<PipelineControl> {
  let totals = ctx.with(|c| {
    let subtotal = OrderTotals::subtotal_of(&c.items)?;
    let delivery_charge = c.app_state.config.delivery_charge_for(subtotal);
    let totals = OrderTotals::compute(&c.items, delivery_charge, c.request.discount.unwrap_or(0))?;
    if let Some(client_total) = c.request.total_amount {
      if client_total != totals.total_amount {
        warn!(client_total, computed = totals.total_amount, "Client total does not match.");
        return Err(AppError::Validation(format!(
          "Order total mismatch: expected ₹{}, got ₹{}",
          totals.total_amount, client_total
        )));
      }
    }
    Ok(totals)
  })?;
  ctx.write().totals = Some(totals);
  Ok(PipelineControl::Continue)
}

async fn assign_order_code(ctx: ContextData<OrderCreateCtxData>) -> AppResult<PipelineControl> {
  let (stores, now) = ctx.with(|c| (c.app_state.stores.clone(), c.now));
  let code = allocate_order_code(stores.orders.as_ref(), now).await?;
  ctx.write().order_code = Some(code);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_create::create_gateway_order", skip_all, err(Display))]
async fn create_gateway_order(ctx: ContextData<OrderCreateCtxData>) -> AppResult<PipelineControl> {
  let (gateway, amount, code) = ctx.with(|c| {
    let totals = c
      .totals
      .ok_or_else(|| AppError::Internal("Totals missing from order context".to_string()))?;
    let code = c
      .order_code
      .clone()
      .ok_or_else(|| AppError::Internal("Order code missing from order context".to_string()))?;
    Ok::<_, AppError>((c.app_state.gateway.clone(), totals.total_amount, code))
  })?;

  let gateway_order = gateway.create_order(amount, &code).await?;
  ctx.write().gateway_order = Some(gateway_order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_create::persist_order", skip_all, err(Display))]
async fn persist_order(ctx: ContextData<OrderCreateCtxData>) -> AppResult<PipelineControl> {
  let (stores, order) = ctx.with(|c| {
    let missing = |what: &str| AppError::Internal(format!("{} missing from order context", what));
    let mut order = Order::place(
      c.order_code.clone().ok_or_else(|| missing("Order code"))?,
      c.user_id,
      c.items.clone(),
      c.customer.clone().ok_or_else(|| missing("Customer info"))?,
      c.totals.ok_or_else(|| missing("Totals"))?,
      c.payment_method.ok_or_else(|| missing("Payment method"))?,
      c.now,
    );
    order.gateway_order_id = c.gateway_order.as_ref().map(|g| g.id.clone());
    Ok::<_, AppError>((c.app_state.stores.clone(), order))
  })?;

  stores.orders.insert(&order).await?;
  info!(
    order_code = %order.order_code,
    total = order.totals.total_amount,
    method = order.payment_method.as_str(),
    "Order placed."
  );
  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

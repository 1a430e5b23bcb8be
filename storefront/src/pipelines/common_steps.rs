// storefront/src/pipelines/common_steps.rs

//! Steps shared by the order flows.

use crate::errors::{AppError, Result as AppResult};
use crate::models::Order;
use crate::pipelines::contexts::OrderFlow;
use crate::state::AppState;
use bakehouse_flow::{ContextData, PipelineControl};
use tracing::instrument;
use uuid::Uuid;

/// Loads an order by id, falling back to its order code.
pub async fn find_order(app_state: &AppState, order_ref: &str) -> AppResult<Order> {
  let order_ref = order_ref.trim();
  if order_ref.is_empty() {
    return Err(AppError::Validation("Order id is required".to_string()));
  }
  let found = match Uuid::parse_str(order_ref) {
    Ok(id) => app_state.stores.orders.find_by_id(id).await?,
    Err(_) => app_state.stores.orders.find_by_code(order_ref).await?,
  };
  found.ok_or_else(|| AppError::NotFound(format!("Order '{}' not found", order_ref)))
}

fn order_snapshot<T: OrderFlow + Send + Sync + 'static>(ctx: &ContextData<T>) -> AppResult<(AppState, Order)> {
  ctx.with(|data| match data.order() {
    Some(order) => Ok((data.app_state().clone(), order.clone())),
    None => Err(AppError::Internal("Order missing from flow context".to_string())),
  })
}

#[instrument(name = "common_step::notify_customer", skip_all, err(Display))]
pub async fn notify_customer<T: OrderFlow + Send + Sync + 'static>(ctx: ContextData<T>) -> AppResult<PipelineControl> {
  let (app_state, order) = order_snapshot(&ctx)?;
  app_state.notifier.notify_customer(&order).await?;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "common_step::notify_owner", skip_all, err(Display))]
pub async fn notify_owner<T: OrderFlow + Send + Sync + 'static>(ctx: ContextData<T>) -> AppResult<PipelineControl> {
  let (app_state, order) = order_snapshot(&ctx)?;
  app_state.notifier.notify_owner(&order).await?;
  Ok(PipelineControl::Continue)
}

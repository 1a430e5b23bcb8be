// tests/common/mod.rs
#![allow(dead_code)]

use bakehouse_flow::{ContextData, FlowError, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// A kitchen ticket moving through the bake line.
#[derive(Clone, Debug, Default)]
pub struct KitchenTicket {
  pub order_code: String,
  pub steps_done: Vec<String>,
  pub stop_at: Option<String>,
  pub eggless: bool,
  pub notified: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TicketError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("kitchen error: {0}")]
  Kitchen(String),
}

impl From<FlowError> for TicketError {
  fn from(e: FlowError) -> Self {
    TicketError::Flow(e.to_string())
  }
}

/// Records `step` on the ticket and stops when the ticket asks for it.
pub fn record_step(
  step: &'static str,
) -> impl Fn(ContextData<KitchenTicket>) -> std::future::Ready<Result<PipelineControl, TicketError>> + Send + Sync {
  move |ctx: ContextData<KitchenTicket>| {
    let mut guard = ctx.write();
    guard.steps_done.push(step.to_string());
    let control = if guard.stop_at.as_deref() == Some(step) {
      PipelineControl::Stop
    } else {
      PipelineControl::Continue
    };
    std::future::ready(Ok(control))
  }
}

pub fn failing_step(
  step: &'static str,
  message: &'static str,
) -> impl Fn(ContextData<KitchenTicket>) -> std::future::Ready<Result<PipelineControl, TicketError>> + Send + Sync {
  move |ctx: ContextData<KitchenTicket>| {
    ctx.write().steps_done.push(step.to_string());
    std::future::ready(Err(TicketError::Kitchen(message.to_string())))
  }
}

pub fn ticket(order_code: &str) -> ContextData<KitchenTicket> {
  ContextData::new(KitchenTicket {
    order_code: order_code.to_string(),
    ..Default::default()
  })
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

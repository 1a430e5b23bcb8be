// core/examples/order_ticket.rs

use bakehouse_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, Workflows};
use tracing::info;

#[derive(Clone, Debug, Default)]
struct OrderTicket {
  subtotal: i64,
  cash_on_delivery: bool,
  gateway_order: Option<String>,
  log: Vec<String>,
}

fn order_pipeline() -> Pipeline<OrderTicket, FlowError> {
  let mut pipeline = Pipeline::<OrderTicket, FlowError>::new(
    "example_order",
    &[
      ("price", false),
      ("register_payment", false),
      ("notify", true),
    ],
  );

  pipeline.on("price", |ctx: ContextData<OrderTicket>| async move {
    let mut data = ctx.write();
    data.subtotal = 750;
    let subtotal = data.subtotal;
    data.log.push(format!("priced at {}", subtotal));
    Ok::<_, FlowError>(PipelineControl::Continue)
  });

  // Cash orders never touch the gateway.
  pipeline.skip_step_if("register_payment", |data| data.cash_on_delivery);
  pipeline.on("register_payment", |ctx: ContextData<OrderTicket>| async move {
    let mut data = ctx.write();
    data.gateway_order = Some("order_demo_1".to_string());
    data.log.push("gateway order registered".to_string());
    Ok::<_, FlowError>(PipelineControl::Continue)
  });

  // Optional: the failure is logged and the run still completes.
  pipeline.on("notify", |_ctx: ContextData<OrderTicket>| async move {
    Err::<PipelineControl, _>(FlowError::Handler {
      source: anyhow::anyhow!("messaging provider offline"),
    })
  });

  pipeline
}

#[tokio::main]
async fn main() -> Result<(), FlowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  let flows = Workflows::<FlowError>::new();
  flows.register(order_pipeline());

  for cash_on_delivery in [false, true] {
    let ctx = ContextData::new(OrderTicket {
      cash_on_delivery,
      ..Default::default()
    });
    let result = flows.run(ctx.clone()).await?;
    assert_eq!(result, PipelineResult::Completed);

    let ticket = ctx.read();
    info!(cash_on_delivery, gateway_order = ?ticket.gateway_order, log = ?ticket.log, "Order ticket processed.");
    assert_eq!(ticket.gateway_order.is_some(), !cash_on_delivery);
  }

  Ok(())
}

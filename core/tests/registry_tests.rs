// tests/registry_tests.rs
mod common;

use bakehouse_flow::{ContextData, Pipeline, PipelineControl, PipelineResult, Workflows};
use common::*;

#[derive(Clone, Debug, Default)]
struct PackingSlip {
  boxes: u32,
}

#[tokio::test]
async fn runs_the_flow_registered_for_each_context_type() {
  setup_tracing();
  let flows = Workflows::<TicketError>::new();

  let mut bake = Pipeline::<KitchenTicket, TicketError>::new("bake", &[("bake", false)]);
  bake.on("bake", record_step("bake"));
  flows.register(bake);

  let mut pack = Pipeline::<PackingSlip, TicketError>::new("pack", &[("pack", false)]);
  pack.on("pack", |ctx: ContextData<PackingSlip>| async move {
    ctx.write().boxes += 2;
    Ok::<_, TicketError>(PipelineControl::Continue)
  });
  flows.register(pack);

  let ticket_ctx = ticket("ORD-10");
  let slip_ctx = ContextData::new(PackingSlip::default());

  assert_eq!(flows.run(ticket_ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(flows.run(slip_ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ticket_ctx.read().steps_done, vec!["bake"]);
  assert_eq!(slip_ctx.read().boxes, 2);
  assert_eq!(flows.names(), vec!["bake".to_string(), "pack".to_string()]);
}

#[tokio::test]
async fn unregistered_context_type_is_an_error() {
  setup_tracing();
  let flows = Workflows::<TicketError>::new();

  let result = flows.run(ContextData::new(PackingSlip::default())).await;

  match result {
    Err(TicketError::Flow(message)) => assert!(message.contains("PackingSlip"), "unexpected message: {message}"),
    other => panic!("expected NotRegistered, got {:?}", other),
  }
  assert!(!flows.is_registered::<PackingSlip>());
}

#[tokio::test]
async fn registering_again_replaces_the_flow() {
  setup_tracing();
  let flows = Workflows::<TicketError>::new();

  let mut first = Pipeline::<KitchenTicket, TicketError>::new("v1", &[("bake", false)]);
  first.on("bake", record_step("bake_v1"));
  flows.register(first);

  let mut second = Pipeline::<KitchenTicket, TicketError>::new("v2", &[("bake", false)]);
  second.on("bake", record_step("bake_v2"));
  flows.register(second);

  let ctx = ticket("ORD-11");
  flows.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_done, vec!["bake_v2"]);
  assert_eq!(flows.names(), vec!["v2".to_string()]);
}

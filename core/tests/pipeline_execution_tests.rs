// tests/pipeline_execution_tests.rs
mod common;

use bakehouse_flow::{ContextData, Pipeline, PipelineControl, PipelineResult};
use common::*;
use serial_test::serial;

fn bake_line() -> Pipeline<KitchenTicket, TicketError> {
  let mut p = Pipeline::new("bake_line", &[("weigh", false), ("mix", false), ("bake", false)]);
  p.on("weigh", record_step("weigh"));
  p.on("mix", record_step("mix"));
  p.on("bake", record_step("bake"));
  p
}

#[tokio::test]
#[serial]
async fn runs_steps_in_declared_order() {
  setup_tracing();
  let ctx = ticket("ORD-1");

  let result = bake_line().run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().steps_done, vec!["weigh", "mix", "bake"]);
}

#[tokio::test]
#[serial]
async fn stop_ends_the_run_without_error() {
  setup_tracing();
  let ctx = ticket("ORD-2");
  ctx.write().stop_at = Some("mix".to_string());

  let result = bake_line().run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Stopped));
  assert_eq!(ctx.read().steps_done, vec!["weigh", "mix"]);
}

#[tokio::test]
#[serial]
async fn required_step_error_aborts_the_run() {
  setup_tracing();
  let mut p = Pipeline::<KitchenTicket, TicketError>::new("burnt", &[("weigh", false), ("bake", false), ("box", false)]);
  p.on("weigh", record_step("weigh"));
  p.on("bake", failing_step("bake", "oven offline"));
  p.on("box", record_step("box"));
  let ctx = ticket("ORD-3");

  let result = p.run(ctx.clone()).await;

  assert_eq!(result, Err(TicketError::Kitchen("oven offline".to_string())));
  assert_eq!(ctx.read().steps_done, vec!["weigh", "bake"]);
}

#[tokio::test]
#[serial]
async fn optional_step_error_is_swallowed() {
  setup_tracing();
  let mut p = Pipeline::<KitchenTicket, TicketError>::new("notify", &[("bake", false), ("notify", true), ("box", false)]);
  p.on("bake", record_step("bake"));
  p.on("notify", failing_step("notify", "messaging down"));
  p.on("box", record_step("box"));
  let ctx = ticket("ORD-4");

  let result = p.run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().steps_done, vec!["bake", "notify", "box"]);
}

#[tokio::test]
#[serial]
async fn required_step_without_handlers_is_reported() {
  setup_tracing();
  let mut p = Pipeline::<KitchenTicket, TicketError>::new("incomplete", &[("weigh", false), ("glaze", false)]);
  p.on("weigh", record_step("weigh"));

  let result = p.run(ticket("ORD-5")).await;

  match result {
    Err(TicketError::Flow(message)) => assert!(message.contains("glaze"), "unexpected message: {message}"),
    other => panic!("expected a flow error, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut p = Pipeline::<KitchenTicket, TicketError>::new("sparse", &[("weigh", false), ("decorate", true)]);
  p.on("weigh", record_step("weigh"));

  assert_eq!(p.run(ticket("ORD-6")).await, Ok(PipelineResult::Completed));
}

#[tokio::test]
#[serial]
async fn skip_condition_bypasses_a_step() {
  setup_tracing();
  let mut p = Pipeline::<KitchenTicket, TicketError>::new("eggs", &[("crack_eggs", false), ("bake", false)]);
  p.on("crack_eggs", record_step("crack_eggs"));
  p.on("bake", record_step("bake"));
  p.skip_step_if("crack_eggs", |t| t.eggless);
  let ctx = ticket("ORD-7");
  ctx.write().eggless = true;

  p.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_done, vec!["bake"]);
}

#[tokio::test]
#[serial]
async fn hooks_run_before_on_after() {
  setup_tracing();
  let mut p = Pipeline::<KitchenTicket, TicketError>::new("hooks", &[("bake", false)]);
  p.after("bake", record_step("cool"));
  p.on("bake", record_step("bake"));
  p.before("bake", record_step("preheat"));
  let ctx = ticket("ORD-8");

  p.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_done, vec!["preheat", "bake", "cool"]);
}

#[tokio::test]
#[serial]
async fn async_handlers_share_the_context() {
  setup_tracing();
  let mut p = Pipeline::<KitchenTicket, TicketError>::new("async", &[("bake", false), ("notify", true)]);
  p.on("bake", |ctx: ContextData<KitchenTicket>| async move {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    ctx.write().steps_done.push("bake".to_string());
    Ok::<_, TicketError>(PipelineControl::Continue)
  });
  p.on("notify", |ctx: ContextData<KitchenTicket>| async move {
    let code = ctx.read().order_code.clone();
    assert_eq!(code, "ORD-9");
    ctx.write().notified = true;
    Ok::<_, TicketError>(PipelineControl::Continue)
  });
  let ctx = ticket("ORD-9");

  p.run(ctx.clone()).await.unwrap();

  let snapshot = ctx.snapshot();
  assert_eq!(snapshot.steps_done, vec!["bake"]);
  assert!(snapshot.notified);
}

#[test]
fn steps_can_be_inserted_and_removed() {
  let mut p = bake_line();
  p.insert_after("mix", "proof", false);
  p.remove_step("weigh");
  p.push_step("box", true);

  assert_eq!(p.step_names(), vec!["mix", "proof", "bake", "box"]);
}

#[test]
#[should_panic(expected = "already defined")]
fn duplicate_step_names_panic() {
  let _ = Pipeline::<KitchenTicket, TicketError>::new("dupes", &[("bake", false), ("bake", true)]);
}

#[test]
#[should_panic(expected = "not defined")]
fn registering_on_unknown_step_panics() {
  let mut p = bake_line();
  p.on("frost", record_step("frost"));
}

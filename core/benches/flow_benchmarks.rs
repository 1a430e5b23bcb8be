use bakehouse_flow::{ContextData, FlowError, Pipeline, PipelineControl, Workflows};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

#[derive(Clone, Debug, Default)]
struct BenchTicket {
  counter: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("bench error: {0}")]
struct BenchError(String);

impl From<FlowError> for BenchError {
  fn from(e: FlowError) -> Self {
    BenchError(e.to_string())
  }
}

fn build_pipeline(steps: usize) -> Pipeline<BenchTicket, BenchError> {
  let names: Vec<String> = (0..steps).map(|i| format!("step_{i}")).collect();
  let defs: Vec<(&str, bool)> = names.iter().map(|n| (n.as_str(), false)).collect();
  let mut p = Pipeline::new("bench", &defs);
  for name in &names {
    p.on(name, |ctx: ContextData<BenchTicket>| async move {
      ctx.write().counter += 1;
      Ok::<_, BenchError>(PipelineControl::Continue)
    });
  }
  p
}

fn bench_pipeline_run(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let mut group = c.benchmark_group("pipeline_run");
  for steps in [1usize, 5, 20] {
    let pipeline = build_pipeline(steps);
    group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, _| {
      b.to_async(&rt).iter(|| async {
        pipeline.run(ContextData::new(BenchTicket::default())).await.unwrap();
      });
    });
  }
  group.finish();
}

fn bench_registry_dispatch(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let flows = Workflows::<BenchError>::new();
  flows.register(build_pipeline(5));
  c.bench_function("registry_dispatch_5_steps", |b| {
    b.to_async(&rt).iter(|| async {
      flows.run(ContextData::new(BenchTicket::default())).await.unwrap();
    });
  });
}

criterion_group!(benches, bench_pipeline_run, bench_registry_dispatch);
criterion_main!(benches);

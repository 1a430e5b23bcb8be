// core/src/registry.rs

//! `Workflows<E>`: pipelines registered once, looked up by context type.

use crate::context::ContextData;
use crate::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync {
  fn pipeline_name(&self) -> &str;

  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct TypedRunner<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Pipeline<T, Err>,
}

#[async_trait]
impl<T, Err, AppErr> ErasedRunner<AppErr> for TypedRunner<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: From<Err> + From<FlowError> + Send + 'static,
{
  fn pipeline_name(&self) -> &str {
    self.pipeline.name()
  }

  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx = match ctx.downcast::<ContextData<T>>() {
      Ok(ctx) => *ctx,
      Err(_) => {
        return Err(AppErr::from(FlowError::TypeMismatch {
          expected_type: type_name::<ContextData<T>>().to_string(),
        }))
      }
    };
    self.pipeline.run(ctx).await.map_err(AppErr::from)
  }
}

/// Registry of flows keyed by the type of their context data.
///
/// The application registers each flow at startup and request handlers run
/// it by passing a freshly built `ContextData<T>`; the handler keeps its own
/// clone of the context to read results afterwards.
pub struct Workflows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> Workflows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for contexts of type `T`, replacing any previous one.
  pub fn register<T, Err>(&self, pipeline: Pipeline<T, Err>)
  where
    T: 'static + Send + Sync,
    Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<Err>,
  {
    debug!(pipeline = %pipeline.name(), context_type = %type_name::<T>(), "Registering flow.");
    self
      .runners
      .write()
      .insert(TypeId::of::<T>(), Arc::new(TypedRunner { pipeline }));
  }

  pub fn is_registered<T: 'static>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<T>())
  }

  /// Names of all registered flows, sorted.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .runners
      .read()
      .values()
      .map(|r| r.pipeline_name().to_string())
      .collect();
    names.sort();
    names
  }

  /// Runs the flow registered for `T` against `ctx`.
  #[instrument(name = "Workflows::run", skip_all, fields(context_type = %type_name::<T>()))]
  pub async fn run<T>(&self, ctx: ContextData<T>) -> Result<PipelineResult, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let runner = self.runners.read().get(&TypeId::of::<T>()).cloned();
    let Some(runner) = runner else {
      error!("No flow registered for this context type.");
      return Err(AppErr::from(FlowError::NotRegistered {
        context_type: type_name::<T>().to_string(),
      }));
    };
    runner.run_erased(Box::new(ctx)).await
  }
}

impl<AppErr> Default for Workflows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

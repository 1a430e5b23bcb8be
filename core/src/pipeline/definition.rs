// core/src/pipeline/definition.rs

//! The `Pipeline<T, Err>` struct and its step list.

use crate::context::Handler;
use crate::error::FlowError;
use std::collections::HashMap;
use std::sync::Arc;

/// Predicate evaluated on the context before a step runs; `true` skips it.
pub type SkipCondition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync + 'static>;

/// One named step of a pipeline.
///
/// An optional step is best-effort: when one of its handlers fails the error
/// is logged and the run continues with the next step. A required step with
/// no handlers is a configuration error reported at run time.
#[derive(Clone)]
pub struct StepDef<T: 'static> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_condition", &self.skip_if.is_some())
      .finish()
  }
}

/// An ordered list of named steps over context data `T`, whose handlers fail
/// with `Err`.
pub struct Pipeline<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, Err>>>,
}

impl<T, Err> Pipeline<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional)` pairs, in run order.
  pub fn new(name: impl Into<String>, steps: &[(&str, bool)]) -> Self {
    let mut pipeline = Self {
      name: name.into(),
      steps: Vec::with_capacity(steps.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    };
    for (step_name, optional) in steps {
      pipeline.push_step(step_name, *optional);
    }
    pipeline
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Appends a step at the end of the pipeline.
  pub fn push_step(&mut self, step_name: &str, optional: bool) {
    self.ensure_step_absent(step_name);
    self.steps.push(StepDef {
      name: step_name.to_string(),
      optional,
      skip_if: None,
    });
  }

  /// Inserts a step right after `existing`.
  pub fn insert_after(&mut self, existing: &str, step_name: &str, optional: bool) {
    let idx = self.position_of(existing);
    self.ensure_step_absent(step_name);
    self.steps.insert(
      idx + 1,
      StepDef {
        name: step_name.to_string(),
        optional,
        skip_if: None,
      },
    );
  }

  /// Removes a step and every hook registered for it. Unknown names are ignored.
  pub fn remove_step(&mut self, step_name: &str) {
    self.steps.retain(|s| s.name != step_name);
    self.before.remove(step_name);
    self.on.remove(step_name);
    self.after.remove(step_name);
  }

  pub fn skip_step_if(&mut self, step_name: &str, condition: impl Fn(&T) -> bool + Send + Sync + 'static) {
    let idx = self.position_of(step_name);
    self.steps[idx].skip_if = Some(Arc::new(condition));
  }

  /// Index of a step. Panics on an unknown name: step names are fixed when
  /// flows are registered at startup, so a miss is a programming error.
  pub(crate) fn position_of(&self, step_name: &str) -> usize {
    match self.steps.iter().position(|s| s.name == step_name) {
      Some(idx) => idx,
      None => panic!(
        "flow setup error: step '{}' is not defined in pipeline '{}'",
        step_name, self.name
      ),
    }
  }

  fn ensure_step_absent(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "flow setup error: step '{}' is already defined in pipeline '{}'",
        step_name, self.name
      );
    }
  }

  pub(crate) fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).is_some_and(|handlers| !handlers.is_empty()))
  }
}

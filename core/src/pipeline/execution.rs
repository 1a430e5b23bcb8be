// core/src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order against one shared context.

use crate::context::{ContextData, Handler};
use crate::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::{Pipeline, StepDef};
use tracing::{debug, info_span, instrument, trace, warn, Instrument};

enum StepOutcome {
  Done,
  Stop,
}

impl<T, Err> Pipeline<T, Err>
where
  T: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes every step against `ctx`.
  ///
  /// A required step's handler error aborts the run and is returned as is.
  /// An optional step's handler error is logged and the run moves on to the
  /// next step. `PipelineControl::Stop` from any handler ends the run with
  /// [`PipelineResult::Stopped`].
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: ContextData<T>) -> Result<PipelineResult, Err> {
    debug!("Pipeline run starting.");

    for (step_idx, step) in self.steps.iter().enumerate() {
      let span = info_span!("flow_step", step = %step.name, step_index = step_idx, optional = step.optional);
      match self.run_step(step, &ctx).instrument(span).await? {
        StepOutcome::Done => {}
        StepOutcome::Stop => {
          debug!(step = %step.name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
      }
    }

    debug!("Pipeline run completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step: &StepDef<T>, ctx: &ContextData<T>) -> Result<StepOutcome, Err> {
    if let Some(condition) = &step.skip_if {
      if ctx.with(|data| condition(data)) {
        debug!("Step skipped by its condition.");
        return Ok(StepOutcome::Done);
      }
    }

    if !self.has_handlers(&step.name) {
      if step.optional {
        trace!("Optional step has no handlers.");
        return Ok(StepOutcome::Done);
      }
      return Err(Err::from(FlowError::HandlerMissing {
        pipeline: self.name.clone(),
        step_name: step.name.clone(),
      }));
    }

    for (phase, handlers) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      let Some(handlers) = handlers.get(&step.name) else {
        continue;
      };
      match run_handlers(phase, handlers, ctx).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return Ok(StepOutcome::Stop),
        Err(e) if step.optional => {
          warn!(error = %e, phase, "Optional step failed; continuing.");
          return Ok(StepOutcome::Done);
        }
        Err(e) => return Err(e),
      }
    }
    Ok(StepOutcome::Done)
  }
}

async fn run_handlers<T, Err>(
  phase: &'static str,
  handlers: &[Handler<T, Err>],
  ctx: &ContextData<T>,
) -> Result<PipelineControl, Err>
where
  T: 'static + Send + Sync,
{
  for (idx, handler) in handlers.iter().enumerate() {
    trace!(phase, handler_index = idx, "Running handler.");
    if handler(ctx.clone()).await? == PipelineControl::Stop {
      return Ok(PipelineControl::Stop);
    }
  }
  Ok(PipelineControl::Continue)
}

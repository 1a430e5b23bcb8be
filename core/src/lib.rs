// core/src/lib.rs

//! Bakehouse flow: small async workflows made of named steps.
//!
//! The storefront expresses its multi-step business processes (OTP issuance,
//! OTP verification, order placement, payment confirmation) as pipelines:
//!  - an ordered list of named steps, each optionally skippable by a predicate,
//!  - `before` / `on` / `after` hooks per step operating on a shared [`ContextData`],
//!  - early, non-error termination through [`PipelineControl::Stop`],
//!  - optional steps whose failures are logged and swallowed (best-effort work
//!    such as customer notifications),
//!  - a type-keyed [`Workflows`] registry so handlers can run a flow by handing
//!    over its context.

pub mod context;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::context::{ContextData, Handler};
pub use crate::control::{PipelineControl, PipelineResult};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::{Pipeline, SkipCondition, StepDef};
pub use crate::registry::Workflows;

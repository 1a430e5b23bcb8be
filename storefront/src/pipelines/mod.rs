// storefront/src/pipelines/mod.rs

//! The storefront's multi-step flows, registered once at startup.

use crate::errors::AppError;
use bakehouse_flow::Workflows;

pub mod common_steps;
pub mod contexts;

pub mod cod_confirm_pipeline;
pub mod order_create_pipeline;
pub mod otp_request_pipeline;
pub mod otp_verify_pipeline;
pub mod payment_verify_pipeline;

pub fn register_all_pipelines(flows: &Workflows<AppError>) {
  tracing::info!("Registering flows...");

  otp_request_pipeline::register_otp_request_pipeline(flows);
  otp_verify_pipeline::register_otp_verify_pipeline(flows);
  order_create_pipeline::register_order_create_pipeline(flows);
  payment_verify_pipeline::register_payment_verify_pipeline(flows);
  cod_confirm_pipeline::register_cod_confirm_pipeline(flows);

  tracing::info!(flows = ?flows.names(), "All flows registered.");
}

// storefront/src/pipelines/otp_request_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Otp, PhoneNumber};
use crate::pipelines::contexts::OtpRequestCtxData;
use crate::services::rate_limit::RateDecision;
use bakehouse_flow::{ContextData, Pipeline, PipelineControl, Workflows};
use tracing::{error, info, instrument, warn};

pub fn build_otp_request_pipeline() -> Pipeline<OtpRequestCtxData, AppError> {
  let mut p = Pipeline::<OtpRequestCtxData, AppError>::new(
    "otp_request",
    &[
      ("validate_phone", false),
      ("check_rate_limit", false),
      ("replace_previous_codes", false),
      ("issue_code", false),
      ("deliver_code", false),
    ],
  );

  p.on("validate_phone", validate_phone);
  p.on("check_rate_limit", check_rate_limit);
  p.on("replace_previous_codes", replace_previous_codes);
  p.on("issue_code", issue_code);
  p.on("deliver_code", deliver_code);
  p
}

pub fn register_otp_request_pipeline(flows: &Workflows<AppError>) {
  flows.register(build_otp_request_pipeline());
  info!("OTP request flow registered.");
}

async fn validate_phone(ctx: ContextData<OtpRequestCtxData>) -> AppResult<PipelineControl> {
  let raw = ctx.with(|c| c.raw_phone.clone());
  let phone = PhoneNumber::parse(&raw)?;
  ctx.write().phone = Some(phone);
  Ok(PipelineControl::Continue)
}

fn phone_of(data: &OtpRequestCtxData) -> AppResult<PhoneNumber> {
  data
    .phone
    .clone()
    .ok_or_else(|| AppError::Internal("Phone missing from OTP request context".to_string()))
}

async fn check_rate_limit(ctx: ContextData<OtpRequestCtxData>) -> AppResult<PipelineControl> {
  let (limiter, phone, now) = ctx.with(|c| Ok::<_, AppError>((c.app_state.rate_limiter.clone(), phone_of(c)?, c.now)))?;
  match limiter.hit_at(phone.as_str(), now) {
    RateDecision::Allowed { remaining } => {
      info!(phone = %phone.masked(), remaining, "OTP request within rate limit.");
      Ok(PipelineControl::Continue)
    }
    RateDecision::Limited { retry_after_secs } => {
      warn!(phone = %phone.masked(), retry_after_secs, "OTP request rate limited.");
      Err(AppError::RateLimited { retry_after_secs })
    }
  }
}

async fn replace_previous_codes(ctx: ContextData<OtpRequestCtxData>) -> AppResult<PipelineControl> {
  let (stores, phone) = ctx.with(|c| Ok::<_, AppError>((c.app_state.stores.clone(), phone_of(c)?)))?;
  let removed = stores.otps.delete_for_phone(phone.as_str()).await?;
  if removed > 0 {
    info!(phone = %phone.masked(), removed, "Superseded previous OTP codes.");
  }
  Ok(PipelineControl::Continue)
}

async fn issue_code(ctx: ContextData<OtpRequestCtxData>) -> AppResult<PipelineControl> {
  let (stores, phone, now) = ctx.with(|c| Ok::<_, AppError>((c.app_state.stores.clone(), phone_of(c)?, c.now)))?;
  let otp = Otp::issue(phone.as_str(), now);
  stores.otps.insert(&otp).await?;
  ctx.write().issued = Some(otp);
  Ok(PipelineControl::Continue)
}

/// Sends the code; if that fails the stored record is removed so it can
/// never be verified.
#[instrument(name = "otp_request::deliver_code", skip_all, err(Display))]
async fn deliver_code(ctx: ContextData<OtpRequestCtxData>) -> AppResult<PipelineControl> {
  let (app_state, phone, otp) = ctx.with(|c| {
    let otp = c
      .issued
      .clone()
      .ok_or_else(|| AppError::Internal("OTP missing from request context".to_string()))?;
    Ok::<_, AppError>((c.app_state.clone(), phone_of(c)?, otp))
  })?;

  if let Err(send_err) = app_state.notifier.send_otp(&phone, &otp.code).await {
    error!(error = %send_err, phone = %phone.masked(), "OTP delivery failed; discarding code.");
    if let Err(cleanup_err) = app_state.stores.otps.delete(otp.id).await {
      error!(error = %cleanup_err, "Failed to discard undelivered OTP.");
    }
    ctx.write().issued = None;
    return Err(match send_err {
      AppError::Delivery(msg) => AppError::Delivery(msg),
      other => AppError::Delivery(other.to_string()),
    });
  }

  info!(phone = %phone.masked(), "OTP sent.");
  Ok(PipelineControl::Continue)
}

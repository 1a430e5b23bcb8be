// storefront/src/pipelines/otp_verify_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Otp, PhoneNumber, User};
use crate::pipelines::contexts::OtpVerifyCtxData;
use crate::services::auth_service::{self, SessionRole};
use bakehouse_flow::{ContextData, Pipeline, PipelineControl, Workflows};
use tracing::{info, instrument, warn};

pub fn build_otp_verify_pipeline() -> Pipeline<OtpVerifyCtxData, AppError> {
  let mut p = Pipeline::<OtpVerifyCtxData, AppError>::new(
    "otp_verify",
    &[
      ("validate_input", false),
      ("load_code", false),
      ("check_code_state", false),
      ("compare_code", false),
      ("consume_code", false),
      ("find_or_create_user", false),
      ("issue_session", false),
    ],
  );

  p.on("validate_input", validate_input);
  p.on("load_code", load_code);
  p.on("check_code_state", check_code_state);
  p.on("compare_code", compare_code);
  p.on("consume_code", consume_code);
  p.on("find_or_create_user", find_or_create_user);
  p.on("issue_session", issue_session);
  p
}

pub fn register_otp_verify_pipeline(flows: &Workflows<AppError>) {
  flows.register(build_otp_verify_pipeline());
  info!("OTP verification flow registered.");
}

fn loaded_otp(data: &OtpVerifyCtxData) -> AppResult<Otp> {
  data
    .otp
    .clone()
    .ok_or_else(|| AppError::Internal("OTP missing from verification context".to_string()))
}

async fn validate_input(ctx: ContextData<OtpVerifyCtxData>) -> AppResult<PipelineControl> {
  let (raw_phone, code) = ctx.with(|c| (c.raw_phone.clone(), c.code.trim().to_string()));
  let phone = PhoneNumber::parse(&raw_phone)?;
  if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
    return Err(AppError::Validation("Please enter the 6-digit code".to_string()));
  }
  ctx.update(|c| {
    c.phone = Some(phone);
    c.code = code;
  });
  Ok(PipelineControl::Continue)
}

async fn load_code(ctx: ContextData<OtpVerifyCtxData>) -> AppResult<PipelineControl> {
  let (stores, phone) = ctx.with(|c| (c.app_state.stores.clone(), c.phone.clone()));
  let phone = phone.ok_or_else(|| AppError::Internal("Phone missing from verification context".to_string()))?;
  let otp = stores
    .otps
    .latest_for_phone(phone.as_str())
    .await?
    .ok_or_else(|| AppError::NotFound("No OTP found for this number. Please request a new one.".to_string()))?;
  ctx.write().otp = Some(otp);
  Ok(PipelineControl::Continue)
}

/// Consumed, expired and exhausted codes are rejected before the code is
/// even compared.
async fn check_code_state(ctx: ContextData<OtpVerifyCtxData>) -> AppResult<PipelineControl> {
  ctx.with(|c| {
    let otp = loaded_otp(c)?;
    let rules = &c.app_state.config.otp;
    if otp.is_used {
      return Err(AppError::OtpAlreadyUsed);
    }
    if otp.is_expired(c.now, rules.expiry_minutes) {
      return Err(AppError::OtpExpired);
    }
    if otp.is_exhausted(rules.max_attempts) {
      return Err(AppError::OtpExhausted);
    }
    Ok(PipelineControl::Continue)
  })
}

#[instrument(name = "otp_verify::compare_code", skip_all, err(Display))]
async fn compare_code(ctx: ContextData<OtpVerifyCtxData>) -> AppResult<PipelineControl> {
  let (stores, otp, code, max_attempts) = ctx.with(|c| {
    Ok::<_, AppError>((
      c.app_state.stores.clone(),
      loaded_otp(c)?,
      c.code.clone(),
      c.app_state.config.otp.max_attempts,
    ))
  })?;

  if otp.matches(&code) {
    return Ok(PipelineControl::Continue);
  }

  let attempts = stores.otps.record_failed_attempt(otp.id).await?;
  warn!(attempts, max_attempts, "Incorrect OTP entered.");
  if attempts >= max_attempts {
    return Err(AppError::OtpExhausted);
  }
  Err(AppError::OtpMismatch {
    attempts_remaining: max_attempts - attempts,
  })
}

async fn consume_code(ctx: ContextData<OtpVerifyCtxData>) -> AppResult<PipelineControl> {
  let (stores, otp) = ctx.with(|c| Ok::<_, AppError>((c.app_state.stores.clone(), loaded_otp(c)?)))?;
  // A concurrent verify may have consumed it between load and here.
  if !stores.otps.mark_used(otp.id).await? {
    return Err(AppError::OtpAlreadyUsed);
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "otp_verify::find_or_create_user", skip_all, err(Display))]
async fn find_or_create_user(ctx: ContextData<OtpVerifyCtxData>) -> AppResult<PipelineControl> {
  let (stores, phone, name, now) = ctx.with(|c| (c.app_state.stores.clone(), c.phone.clone(), c.name.clone(), c.now));
  let phone = phone.ok_or_else(|| AppError::Internal("Phone missing from verification context".to_string()))?;

  let (user, is_new_user) = match stores.users.find_by_phone(phone.as_str()).await? {
    Some(mut user) => {
      user.record_login(name, now);
      stores.users.update(&user).await?;
      (user, false)
    }
    None => {
      let user = User::verified(phone.as_str(), name, now);
      stores.users.insert(&user).await?;
      (user, true)
    }
  };

  info!(user_id = %user.id, is_new_user, "User signed in with OTP.");
  ctx.update(|c| {
    c.user = Some(user);
    c.is_new_user = is_new_user;
  });
  Ok(PipelineControl::Continue)
}

async fn issue_session(ctx: ContextData<OtpVerifyCtxData>) -> AppResult<PipelineControl> {
  let token = ctx.with(|c| {
    let user = c
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("User missing from verification context".to_string()))?;
    auth_service::issue_session_token(&c.app_state.config.jwt_secret, user.id, SessionRole::User)
  })?;
  ctx.write().session_token = Some(token);
  Ok(PipelineControl::Continue)
}

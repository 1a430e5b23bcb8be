// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{OtpRequestCtxData, OtpVerifyCtxData};
use crate::services::auth_service::{removal_cookie, session_cookie, SessionRole};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use bakehouse_flow::{ContextData, PipelineResult};

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpPayload {
  #[serde(alias = "phone")]
  pub phone_number: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpPayload {
  #[serde(alias = "phone")]
  pub phone_number: String,
  pub otp: String,
  pub name: Option<String>,
}

// --- Handlers ---

#[instrument(name = "handler::send_otp", skip_all)]
pub async fn send_otp_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SendOtpPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(OtpRequestCtxData::new(app_state.get_ref().clone(), payload.phone_number));

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let phone = ctx.with(|c| c.phone.as_ref().map(|p| p.masked())).unwrap_or_default();
      info!(phone = %phone, "OTP sent.");
      Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "OTP sent to your WhatsApp number",
        "expiresInMinutes": app_state.config.otp.expiry_minutes,
      })))
    }
    PipelineResult::Stopped => {
      warn!("OTP request flow stopped before sending a code.");
      Err(AppError::Internal("OTP request was halted by an internal step.".to_string()))
    }
  }
}

#[instrument(name = "handler::verify_otp", skip_all)]
pub async fn verify_otp_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<VerifyOtpPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(OtpVerifyCtxData::new(
    app_state.get_ref().clone(),
    payload.phone_number,
    payload.otp,
    payload.name,
  ));

  if app_state.flows.run(ctx.clone()).await? == PipelineResult::Stopped {
    return Err(AppError::Internal("OTP verification was halted by an internal step.".to_string()));
  }

  let (user, token, is_new_user) = ctx.with(|c| (c.user.clone(), c.session_token.clone(), c.is_new_user));
  let (Some(user), Some(token)) = (user, token) else {
    return Err(AppError::Internal("Verification completed without a session.".to_string()));
  };

  info!(user_id = %user.id, is_new_user, "Customer signed in.");
  Ok(
    HttpResponse::Ok()
      .cookie(session_cookie(SessionRole::User, token, app_state.config.cookie_secure))
      .json(json!({
        "success": true,
        "message": "Signed in successfully",
        "user": user,
        "isNewUser": is_new_user,
      })),
  )
}

#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok()
    .cookie(removal_cookie(SessionRole::User, app_state.config.cookie_secure))
    .json(json!({ "success": true }))
}

#[instrument(name = "handler::me", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn me_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = app_state
    .stores
    .users
    .find_by_id(auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

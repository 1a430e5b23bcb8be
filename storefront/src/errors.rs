// storefront/src/errors.rs

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use bakehouse_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Too many requests; retry in {retry_after_secs}s")]
  RateLimited { retry_after_secs: u64 },

  #[error("OTP has expired")]
  OtpExpired,

  #[error("OTP does not match ({attempts_remaining} attempts remaining)")]
  OtpMismatch { attempts_remaining: i32 },

  #[error("Too many incorrect OTP attempts")]
  OtpExhausted,

  #[error("OTP has already been used")]
  OtpAlreadyUsed,

  #[error("Payment signature verification failed")]
  SignatureMismatch,

  #[error("Cannot move order from '{from}' to '{to}'")]
  InvalidTransition { from: String, to: String },

  #[error("Message delivery failed: {0}")]
  Delivery(String),

  #[error("Payment gateway error: {0}")]
  Gateway(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

impl From<sqlx::migrate::MigrateError> for AppError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    AppError::Internal(format!("Migration failed: {}", err))
  }
}

impl AppError {
  /// Short machine-readable code sent alongside the message.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "validation_error",
      AppError::Auth(_) => "unauthorized",
      AppError::NotFound(_) => "not_found",
      AppError::Conflict(_) => "conflict",
      AppError::RateLimited { .. } => "rate_limited",
      AppError::OtpExpired => "otp_expired",
      AppError::OtpMismatch { .. } => "otp_mismatch",
      AppError::OtpExhausted => "otp_exhausted",
      AppError::OtpAlreadyUsed => "otp_already_used",
      AppError::SignatureMismatch => "signature_mismatch",
      AppError::InvalidTransition { .. } => "invalid_transition",
      AppError::Delivery(_) => "delivery_failed",
      AppError::Gateway(_) => "gateway_error",
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => "internal_error",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_)
      | AppError::OtpExpired
      | AppError::OtpMismatch { .. }
      | AppError::OtpAlreadyUsed
      | AppError::SignatureMismatch => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
      AppError::RateLimited { .. } | AppError::OtpExhausted => StatusCode::TOO_MANY_REQUESTS,
      AppError::Delivery(_) | AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }

    let mut builder = HttpResponse::build(status);
    match self {
      AppError::RateLimited { retry_after_secs } => builder
        .insert_header((header::RETRY_AFTER, retry_after_secs.to_string()))
        .json(json!({
          "error": self.to_string(),
          "code": self.code(),
          "retryAfterSeconds": retry_after_secs,
        })),
      AppError::OtpMismatch { attempts_remaining } => builder.json(json!({
        "error": "Invalid OTP",
        "code": self.code(),
        "attemptsRemaining": attempts_remaining,
      })),
      AppError::Validation(m) | AppError::Auth(m) | AppError::NotFound(m) | AppError::Conflict(m) => {
        builder.json(json!({"error": m, "code": self.code()}))
      }
      AppError::Delivery(_) => builder.json(json!({
        "error": "Could not deliver the message. Please try again.",
        "code": self.code(),
      })),
      AppError::Gateway(_) => builder.json(json!({
        "error": "Payment provider is unavailable. Please try again.",
        "code": self.code(),
      })),
      _ if status.is_server_error() => builder.json(json!({
        "error": "An internal error occurred",
        "code": self.code(),
      })),
      _ => builder.json(json!({"error": self.to_string(), "code": self.code()})),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn taxonomy_maps_to_http_statuses() {
    assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Auth("x".into()).status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
      AppError::RateLimited { retry_after_secs: 30 }.status_code(),
      StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(AppError::Delivery("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(AppError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn rate_limited_response_carries_retry_after() {
    let response = AppError::RateLimited { retry_after_secs: 42 }.error_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
  }

  #[test]
  fn anyhow_wrapping_an_app_error_is_unwrapped() {
    let wrapped = anyhow::Error::new(AppError::OtpExpired);

    assert!(matches!(AppError::from(wrapped), AppError::OtpExpired));
  }
}

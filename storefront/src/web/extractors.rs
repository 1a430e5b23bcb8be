// storefront/src/web/extractors.rs

//! Session extractors. Sessions travel in HTTP-only cookies holding HS256
//! tokens issued by `auth_service`.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::auth_service::{verify_session_token, SessionRole};
use crate::state::AppState;

/// A signed-in customer. Rejects the request with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

/// A customer session if one is present and valid. Checkout and reviews work
/// for guests too.
#[derive(Debug, Clone, Copy)]
pub struct OptionalUser(pub Option<Uuid>);

/// The signed-in store administrator.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession {
  pub admin_id: Uuid,
}

fn session_subject(req: &HttpRequest, role: SessionRole) -> Result<Option<Uuid>, AppError> {
  let Some(cookie) = req.cookie(role.cookie_name()) else {
    return Ok(None);
  };
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured".to_string()))?;
  let claims = verify_session_token(&state.config.jwt_secret, cookie.value(), role)?;
  Ok(Some(claims.sub))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(match session_subject(req, SessionRole::User) {
      Ok(Some(user_id)) => Ok(AuthenticatedUser { user_id }),
      Ok(None) => Err(AppError::Auth("Please sign in to continue".to_string())),
      Err(e) => Err(e),
    })
  }
}

impl FromRequest for OptionalUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(match session_subject(req, SessionRole::User) {
      Ok(user_id) => Ok(OptionalUser(user_id)),
      Err(AppError::Auth(reason)) => {
        debug!(reason, "Ignoring invalid customer session.");
        Ok(OptionalUser(None))
      }
      Err(e) => Err(e),
    })
  }
}

impl FromRequest for AdminSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(match session_subject(req, SessionRole::Admin) {
      Ok(Some(admin_id)) => Ok(AdminSession { admin_id }),
      Ok(None) => Err(AppError::Auth("Admin sign-in required".to_string())),
      Err(e) => Err(e),
    })
  }
}

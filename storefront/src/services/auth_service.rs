// storefront/src/services/auth_service.rs

//! Admin password hashing and the signed session tokens carried in cookies.

use crate::errors::AppError;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

pub const USER_COOKIE: &str = "session";
pub const ADMIN_COOKIE: &str = "admin_session";

pub const USER_SESSION_DAYS: i64 = 7;
pub const ADMIN_SESSION_HOURS: i64 = 24;

pub const MIN_ADMIN_PASSWORD_LEN: usize = 8;

/// Hashes an admin password with Argon2 and a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.len() < MIN_ADMIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters",
      MIN_ADMIN_PASSWORD_LEN
    )));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing failed: {}", e))
    })
}

/// Checks a password against a stored Argon2 hash. A mismatch is `Ok(false)`;
/// only a malformed hash or an Argon2 failure is an error.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided: &str) -> Result<bool, AppError> {
  if provided.is_empty() {
    return Ok(false);
  }

  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored password hash is malformed.");
    AppError::Internal(format!("Invalid stored password hash: {}", e))
  })?;

  match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(e) => {
      error!(error = %e, "Argon2 password verification failed.");
      Err(AppError::Internal(format!("Password verification failed: {}", e)))
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
  User,
  Admin,
}

impl SessionRole {
  pub fn cookie_name(self) -> &'static str {
    match self {
      SessionRole::User => USER_COOKIE,
      SessionRole::Admin => ADMIN_COOKIE,
    }
  }

  pub fn lifetime(self) -> Duration {
    match self {
      SessionRole::User => Duration::days(USER_SESSION_DAYS),
      SessionRole::Admin => Duration::hours(ADMIN_SESSION_HOURS),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
  pub sub: Uuid,
  pub role: SessionRole,
  pub iat: i64,
  pub exp: i64,
}

/// Signs an HS256 session token for `subject`.
#[instrument(name = "auth_service::issue_session_token", skip(secret), err(Display))]
pub fn issue_session_token(secret: &str, subject: Uuid, role: SessionRole) -> Result<String, AppError> {
  let now = Utc::now();
  let claims = SessionClaims {
    sub: subject,
    role,
    iat: now.timestamp(),
    exp: (now + role.lifetime()).timestamp(),
  };
  encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
    .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
}

/// Validates signature, expiry and role of a session token.
pub fn verify_session_token(secret: &str, token: &str, expected_role: SessionRole) -> Result<SessionClaims, AppError> {
  let data = decode::<SessionClaims>(
    token,
    &DecodingKey::from_secret(secret.as_bytes()),
    &Validation::new(Algorithm::HS256),
  )
  .map_err(|e| {
    warn!(error = %e, "Rejected session token.");
    AppError::Auth("Session is invalid or has expired".to_string())
  })?;

  if data.claims.role != expected_role {
    return Err(AppError::Auth("Session is not valid for this resource".to_string()));
  }
  Ok(data.claims)
}

/// HTTP-only cookie carrying a session token for `role`.
pub fn session_cookie(role: SessionRole, token: String, secure: bool) -> Cookie<'static> {
  Cookie::build(role.cookie_name(), token)
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(secure)
    .max_age(CookieDuration::seconds(role.lifetime().num_seconds()))
    .finish()
}

/// Cookie that clears the session for `role` in the browser.
pub fn removal_cookie(role: SessionRole, secure: bool) -> Cookie<'static> {
  let mut cookie = session_cookie(role, String::new(), secure);
  cookie.make_removal();
  cookie
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "unit-test-secret-unit-test-secret";

  #[test]
  fn password_round_trip() {
    let hash = hash_password("correct horse battery").unwrap();

    assert!(verify_password(&hash, "correct horse battery").unwrap());
    assert!(!verify_password(&hash, "wrong horse").unwrap());
  }

  #[test]
  fn short_passwords_are_rejected() {
    assert!(matches!(hash_password("short"), Err(AppError::Validation(_))));
  }

  #[test]
  fn user_token_is_not_an_admin_token() {
    let user_id = Uuid::new_v4();
    let token = issue_session_token(SECRET, user_id, SessionRole::User).unwrap();

    assert_eq!(verify_session_token(SECRET, &token, SessionRole::User).unwrap().sub, user_id);
    assert!(matches!(
      verify_session_token(SECRET, &token, SessionRole::Admin),
      Err(AppError::Auth(_))
    ));
  }

  #[test]
  fn token_signed_with_another_secret_is_rejected() {
    let token = issue_session_token(SECRET, Uuid::new_v4(), SessionRole::User).unwrap();

    assert!(verify_session_token("another-secret-another-secret-xx", &token, SessionRole::User).is_err());
  }

  #[test]
  fn cookies_are_http_only() {
    let cookie = session_cookie(SessionRole::Admin, "token".to_string(), true);

    assert_eq!(cookie.name(), ADMIN_COOKIE);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.max_age(), Some(CookieDuration::hours(24)));
  }
}

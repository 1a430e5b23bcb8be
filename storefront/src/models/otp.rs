// storefront/src/models/otp.rs

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A one-time login code for a phone number.
///
/// Lifecycle: issued, then exactly one of consumed (`is_used`), expired
/// (older than the window) or exhausted (`attempts` reached the limit).
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Otp {
  pub id: Uuid,
  /// Canonical 10-digit phone.
  pub phone: String,
  #[serde(skip_serializing)]
  pub code: String,
  pub created_at: DateTime<Utc>,
  pub is_used: bool,
  pub attempts: i32,
}

impl Otp {
  pub fn issue(phone: &str, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      phone: phone.to_string(),
      code: generate_code(),
      created_at: now,
      is_used: false,
      attempts: 0,
    }
  }

  pub fn is_expired(&self, now: DateTime<Utc>, window_minutes: i64) -> bool {
    now - self.created_at > Duration::minutes(window_minutes)
  }

  pub fn is_exhausted(&self, max_attempts: i32) -> bool {
    self.attempts >= max_attempts
  }

  /// Compares without short-circuiting on the first differing digit.
  pub fn matches(&self, candidate: &str) -> bool {
    let candidate = candidate.trim().as_bytes();
    let code = self.code.as_bytes();
    if candidate.len() != code.len() {
      return false;
    }
    code.iter().zip(candidate).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
  }
}

/// Six random decimal digits, never starting with 0.
pub fn generate_code() -> String {
  rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

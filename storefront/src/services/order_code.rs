// storefront/src/services/order_code.rs

use crate::db::OrderStore;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::warn;

pub const MAX_CODE_ATTEMPTS: usize = 8;

/// `ORD-YYMMDD-NNNNN` with five random digits.
pub fn generate_order_code(now: DateTime<Utc>) -> String {
  let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
  format!("ORD-{}-{:05}", now.format("%y%m%d"), suffix)
}

/// Picks an order code not yet used by any stored order.
pub async fn allocate_order_code(orders: &dyn OrderStore, now: DateTime<Utc>) -> Result<String> {
  for attempt in 1..=MAX_CODE_ATTEMPTS {
    let code = generate_order_code(now);
    if !orders.code_exists(&code).await? {
      return Ok(code);
    }
    warn!(attempt, %code, "Order code collision; retrying.");
  }
  Err(AppError::Internal(format!(
    "Could not allocate a unique order code after {} attempts",
    MAX_CODE_ATTEMPTS
  )))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn code_carries_the_date() {
    let now = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();

    let code = generate_order_code(now);

    assert!(code.starts_with("ORD-250307-"), "{code}");
    assert_eq!(code.len(), "ORD-250307-00000".len());
    assert!(code[11..].chars().all(|c| c.is_ascii_digit()));
  }
}

// storefront/src/models/phone.rs

use crate::errors::AppError;
use serde::{Serialize, Serializer};
use std::fmt;

/// An Indian mobile number in canonical 10-digit form.
///
/// Accepts the usual ways customers type it (`98765 43210`, `+91-9876543210`,
/// `09876543210`) and rejects anything that is not a mobile number starting
/// with 6-9.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
  pub fn parse(raw: &str) -> Result<Self, AppError> {
    let compact: String = raw
      .trim()
      .chars()
      .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
      .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    if digits.is_empty() {
      return Err(AppError::Validation("Phone number is required".to_string()));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
      return Err(invalid());
    }

    let local = match digits.len() {
      10 => digits,
      11 if digits.starts_with('0') => &digits[1..],
      12 if digits.starts_with("91") => &digits[2..],
      _ => return Err(invalid()),
    };

    match local.chars().next() {
      Some('6'..='9') => Ok(PhoneNumber(local.to_string())),
      _ => Err(invalid()),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Country-code-prefixed form expected by the WhatsApp API (`91XXXXXXXXXX`).
  pub fn whatsapp_recipient(&self) -> String {
    format!("91{}", self.0)
  }

  /// Form safe for logs: first two and last two digits only.
  pub fn masked(&self) -> String {
    format!("{}******{}", &self.0[..2], &self.0[8..])
  }
}

fn invalid() -> AppError {
  AppError::Validation("Please enter a valid 10-digit mobile number".to_string())
}

impl fmt::Display for PhoneNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl Serialize for PhoneNumber {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_common_spellings() {
    for raw in ["9876543210", "+91 98765 43210", "91-9876543210", "09876543210", " 98765-43210 "] {
      assert_eq!(PhoneNumber::parse(raw).unwrap().as_str(), "9876543210", "input {raw:?}");
    }
  }

  #[test]
  fn rejects_malformed_numbers() {
    for raw in ["12345", "5876543210", "98765432101", "98765abcde", "", "+1 415 555 0100"] {
      assert!(PhoneNumber::parse(raw).is_err(), "input {raw:?} should be rejected");
    }
  }

  #[test]
  fn every_mobile_prefix_is_accepted() {
    for first in ['6', '7', '8', '9'] {
      let raw = format!("{first}000000000");
      assert!(PhoneNumber::parse(&raw).is_ok());
    }
  }

  #[test]
  fn recipient_and_mask_forms() {
    let phone = PhoneNumber::parse("9876543210").unwrap();

    assert_eq!(phone.whatsapp_recipient(), "919876543210");
    assert_eq!(phone.masked(), "98******10");
  }
}

// storefront/src/models/user.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
  #[default]
  Home,
  Work,
  Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id: Uuid,
  pub name: String,
  pub address: String,
  pub city: Option<String>,
  pub pincode: Option<String>,
  pub phone: Option<String>,
  #[serde(rename = "type")]
  pub address_type: AddressType,
  pub is_default: bool,
}

/// Payload for a new saved address.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
  pub name: String,
  pub address: String,
  pub city: Option<String>,
  pub pincode: Option<String>,
  pub phone: Option<String>,
  #[serde(rename = "type", default)]
  pub address_type: AddressType,
  #[serde(default)]
  pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub phone: String,
  pub is_verified: bool,
  pub name: Option<String>,
  pub email: Option<String>,
  pub addresses: Vec<Address>,
  pub last_login_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  /// A user created by a first successful OTP login.
  pub fn verified(phone: &str, name: Option<String>, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      phone: phone.to_string(),
      is_verified: true,
      name: clean(name),
      email: None,
      addresses: Vec::new(),
      last_login_at: Some(now),
      created_at: now,
      updated_at: now,
    }
  }

  /// Records a later login. A supplied name only fills in a missing one.
  pub fn record_login(&mut self, name: Option<String>, now: DateTime<Utc>) {
    self.is_verified = true;
    self.last_login_at = Some(now);
    if self.name.is_none() {
      self.name = clean(name);
    }
    self.updated_at = now;
  }

  pub fn update_profile(&mut self, name: Option<String>, email: Option<String>, now: DateTime<Utc>) -> Result<(), AppError> {
    if let Some(name) = name {
      let name = name.trim();
      if name.is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
      }
      self.name = Some(name.to_string());
    }
    if let Some(email) = email {
      let email = email.trim();
      if email.is_empty() {
        self.email = None;
      } else if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Validation("Please enter a valid email address".to_string()));
      } else {
        self.email = Some(email.to_lowercase());
      }
    }
    self.updated_at = now;
    Ok(())
  }

  /// Saves an address. The first address, or one flagged default, becomes
  /// the only default.
  pub fn add_address(&mut self, new: NewAddress, now: DateTime<Utc>) -> Result<&Address, AppError> {
    if new.name.trim().is_empty() || new.address.trim().is_empty() {
      return Err(AppError::Validation("Address name and address are required".to_string()));
    }
    let is_default = new.is_default || self.addresses.is_empty();
    if is_default {
      self.addresses.iter_mut().for_each(|a| a.is_default = false);
    }
    self.addresses.push(Address {
      id: Uuid::new_v4(),
      name: new.name.trim().to_string(),
      address: new.address.trim().to_string(),
      city: clean(new.city),
      pincode: clean(new.pincode),
      phone: clean(new.phone),
      address_type: new.address_type,
      is_default,
    });
    self.updated_at = now;
    Ok(&self.addresses[self.addresses.len() - 1])
  }

  /// Removes an address; if it was the default, the first remaining one
  /// takes over.
  pub fn remove_address(&mut self, address_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
    let idx = self
      .addresses
      .iter()
      .position(|a| a.id == address_id)
      .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;
    let removed = self.addresses.remove(idx);
    if removed.is_default {
      if let Some(first) = self.addresses.first_mut() {
        first.is_default = true;
      }
    }
    self.updated_at = now;
    Ok(())
  }
}

fn clean(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

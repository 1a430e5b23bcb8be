// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Razorpay credentials. Without a key id the server falls back to the
/// local mock gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
  pub key_id: Option<String>,
  pub key_secret: String,
  pub api_base: String,
  pub currency: String,
}

/// WhatsApp Cloud API settings. Without an access token messages are only logged.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
  pub api_base: String,
  pub phone_number_id: String,
  pub access_token: Option<String>,
  pub template_language: String,
  pub otp_template: String,
  pub order_template: String,
  pub owner_template: String,
}

#[derive(Debug, Clone)]
pub struct OtpConfig {
  pub expiry_minutes: i64,
  pub max_attempts: i32,
  pub rate_limit_max: usize,
  pub rate_limit_window_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server on the in-memory store.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub app_base_url: String,

  pub jwt_secret: String,
  pub cookie_secure: bool,

  pub gateway: GatewayConfig,
  pub whatsapp: WhatsAppConfig,
  pub otp: OtpConfig,

  /// Fallback owner number used when the admin record has none.
  pub store_owner_phone: Option<String>,
  pub support_contact: String,

  /// Flat delivery charge in rupees, waived at or above the threshold.
  pub delivery_charge: i64,
  pub free_delivery_threshold: i64,

  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let server_host = var_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_or("SERVER_PORT", 8080u16)?;
    let app_base_url = optional_var("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let jwt_secret = optional_var("JWT_SECRET").ok_or_else(|| {
      AppError::Config("Missing environment variable 'JWT_SECRET'".to_string())
    })?;
    if jwt_secret.len() < 32 {
      return Err(AppError::Config("JWT_SECRET must be at least 32 characters".to_string()));
    }

    let gateway = GatewayConfig {
      key_id: optional_var("RAZORPAY_KEY_ID"),
      key_secret: var_or("RAZORPAY_KEY_SECRET", ""),
      api_base: var_or("RAZORPAY_API_BASE", "https://api.razorpay.com"),
      currency: var_or("PAYMENT_CURRENCY", "INR"),
    };
    if gateway.key_id.is_some() && gateway.key_secret.is_empty() {
      return Err(AppError::Config(
        "RAZORPAY_KEY_SECRET is required when RAZORPAY_KEY_ID is set".to_string(),
      ));
    }

    let whatsapp = WhatsAppConfig {
      api_base: var_or("WHATSAPP_API_BASE", "https://graph.facebook.com/v19.0"),
      phone_number_id: var_or("WHATSAPP_PHONE_NUMBER_ID", ""),
      access_token: optional_var("WHATSAPP_ACCESS_TOKEN"),
      template_language: var_or("WHATSAPP_TEMPLATE_LANGUAGE", "en"),
      otp_template: var_or("WHATSAPP_OTP_TEMPLATE", "login_otp"),
      order_template: var_or("WHATSAPP_ORDER_TEMPLATE", "order_confirmation"),
      owner_template: var_or("WHATSAPP_OWNER_TEMPLATE", "new_order_alert"),
    };

    let otp = OtpConfig {
      expiry_minutes: parse_or("OTP_EXPIRY_MINUTES", 10)?,
      max_attempts: parse_or("OTP_MAX_ATTEMPTS", 3)?,
      rate_limit_max: parse_or("OTP_RATE_LIMIT_MAX", 3)?,
      rate_limit_window_minutes: parse_or("OTP_RATE_LIMIT_WINDOW_MINUTES", 10)?,
    };

    let config = Self {
      server_host,
      server_port,
      database_url: optional_var("DATABASE_URL"),
      database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
      app_base_url,
      jwt_secret,
      cookie_secure: parse_or("COOKIE_SECURE", false)?,
      gateway,
      whatsapp,
      otp,
      store_owner_phone: optional_var("STORE_OWNER_PHONE"),
      support_contact: var_or("SUPPORT_CONTACT", "+91 90000 00000"),
      delivery_charge: parse_or("DELIVERY_CHARGE", 0)?,
      free_delivery_threshold: parse_or("FREE_DELIVERY_THRESHOLD", 0)?,
      seed_db: parse_or("SEED_DB", false)?,
    };

    // Secrets stay out of the log.
    tracing::info!(
      host = %config.server_host,
      port = config.server_port,
      database = config.database_url.is_some(),
      gateway_live = config.gateway.key_id.is_some(),
      whatsapp_live = config.whatsapp.access_token.is_some(),
      "Application configuration loaded."
    );
    Ok(config)
  }

  /// A self-contained configuration with mock integrations and the
  /// in-memory store. Used by the test suite and local experiments.
  pub fn for_tests() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: None,
      database_max_connections: 1,
      app_base_url: "http://localhost:3000".to_string(),
      jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
      cookie_secure: false,
      gateway: GatewayConfig {
        key_id: None,
        key_secret: "rzp_test_secret".to_string(),
        api_base: "http://localhost:0".to_string(),
        currency: "INR".to_string(),
      },
      whatsapp: WhatsAppConfig {
        api_base: "http://localhost:0".to_string(),
        phone_number_id: "000".to_string(),
        access_token: None,
        template_language: "en".to_string(),
        otp_template: "login_otp".to_string(),
        order_template: "order_confirmation".to_string(),
        owner_template: "new_order_alert".to_string(),
      },
      otp: OtpConfig {
        expiry_minutes: 10,
        max_attempts: 3,
        rate_limit_max: 3,
        rate_limit_window_minutes: 10,
      },
      store_owner_phone: Some("9123456780".to_string()),
      support_contact: "+91 90000 00000".to_string(),
      delivery_charge: 0,
      free_delivery_threshold: 0,
      seed_db: false,
    }
  }

  /// Delivery charge for a given subtotal.
  pub fn delivery_charge_for(&self, subtotal: i64) -> i64 {
    if self.free_delivery_threshold > 0 && subtotal >= self.free_delivery_threshold {
      0
    } else {
      self.delivery_charge
    }
  }
}

fn optional_var(name: &str) -> Option<String> {
  env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
  optional_var(name).unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match optional_var(name) {
    Some(raw) => raw
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e))),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn delivery_is_free_above_threshold() {
    let mut config = AppConfig::for_tests();
    config.delivery_charge = 50;
    config.free_delivery_threshold = 1000;

    assert_eq!(config.delivery_charge_for(999), 50);
    assert_eq!(config.delivery_charge_for(1000), 0);
  }

  #[test]
  fn zero_threshold_always_charges() {
    let mut config = AppConfig::for_tests();
    config.delivery_charge = 40;

    assert_eq!(config.delivery_charge_for(5000), 40);
  }
}

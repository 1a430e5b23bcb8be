// storefront/src/state.rs

use crate::config::AppConfig;
use crate::db::Stores;
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::messaging::{LoggingMessenger, Messenger, WhatsAppClient};
use crate::services::notifications::Notifier;
use crate::services::payment_gateway::{MockGateway, PaymentGateway, RazorpayClient};
use crate::services::rate_limit::{InMemoryRateLimiter, RateLimiter};
use bakehouse_flow::Workflows;
use chrono::Duration;
use std::sync::Arc;

/// Everything a handler or a flow step needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub stores: Stores,
  pub flows: Arc<Workflows<AppError>>,
  pub rate_limiter: Arc<dyn RateLimiter>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub notifier: Arc<Notifier>,
}

/// External integrations, swappable for tests.
pub struct Integrations {
  pub messenger: Arc<dyn Messenger>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub rate_limiter: Arc<dyn RateLimiter>,
}

impl Integrations {
  /// Live WhatsApp and Razorpay clients where credentials are configured,
  /// logging and mock stand-ins otherwise.
  pub fn from_config(config: &AppConfig) -> Result<Self> {
    let messenger: Arc<dyn Messenger> = match &config.whatsapp.access_token {
      Some(token) => Arc::new(WhatsAppClient::new(&config.whatsapp, token.clone())?),
      None => {
        tracing::warn!("WHATSAPP_ACCESS_TOKEN is not set; messages will only be logged.");
        Arc::new(LoggingMessenger)
      }
    };
    let gateway: Arc<dyn PaymentGateway> = match &config.gateway.key_id {
      Some(key_id) => Arc::new(RazorpayClient::new(&config.gateway, key_id.clone())?),
      None => {
        tracing::warn!("RAZORPAY_KEY_ID is not set; using the mock payment gateway.");
        Arc::new(MockGateway::new(config.gateway.currency.clone()))
      }
    };
    Ok(Self {
      messenger,
      gateway,
      rate_limiter: default_rate_limiter(config),
    })
  }
}

pub fn default_rate_limiter(config: &AppConfig) -> Arc<dyn RateLimiter> {
  Arc::new(InMemoryRateLimiter::new(
    config.otp.rate_limit_max,
    Duration::minutes(config.otp.rate_limit_window_minutes),
  ))
}

impl AppState {
  /// Wires the state together and registers every flow.
  pub fn new(config: Arc<AppConfig>, stores: Stores, integrations: Integrations) -> Self {
    let flows = Arc::new(Workflows::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    let notifier = Arc::new(Notifier::new(&config, integrations.messenger, stores.admins.clone()));
    Self {
      config,
      stores,
      flows,
      rate_limiter: integrations.rate_limiter,
      gateway: integrations.gateway,
      notifier,
    }
  }
}

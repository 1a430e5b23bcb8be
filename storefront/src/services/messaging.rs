// storefront/src/services/messaging.rs

//! Outbound WhatsApp template messages.

use crate::config::WhatsAppConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, instrument};

/// A template message addressed to a WhatsApp recipient (`91XXXXXXXXXX`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMessage {
  pub to: String,
  pub template: String,
  /// Body parameters, in template order.
  pub parameters: Vec<String>,
}

#[async_trait]
pub trait Messenger: Send + Sync {
  /// Sends one message. Any failure is reported as `AppError::Delivery`.
  async fn send(&self, message: &TemplateMessage) -> Result<(), AppError>;
}

/// Request body of the Cloud API `messages` endpoint.
pub fn template_payload(message: &TemplateMessage, language: &str) -> Value {
  let parameters: Vec<Value> = message
    .parameters
    .iter()
    .map(|text| json!({ "type": "text", "text": text }))
    .collect();
  json!({
    "messaging_product": "whatsapp",
    "to": message.to,
    "type": "template",
    "template": {
      "name": message.template,
      "language": { "code": language },
      "components": [{ "type": "body", "parameters": parameters }],
    },
  })
}

#[derive(Debug, Deserialize)]
struct SendResponse {
  #[serde(default)]
  messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
  id: String,
}

/// WhatsApp Cloud API client.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
  http: Client,
  endpoint: String,
  access_token: String,
  language: String,
}

impl WhatsAppClient {
  pub fn new(config: &WhatsAppConfig, access_token: String) -> Result<Self, AppError> {
    let http = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build WhatsApp HTTP client: {}", e)))?;
    Ok(Self {
      http,
      endpoint: format!(
        "{}/{}/messages",
        config.api_base.trim_end_matches('/'),
        config.phone_number_id
      ),
      access_token,
      language: config.template_language.clone(),
    })
  }
}

#[async_trait]
impl Messenger for WhatsAppClient {
  #[instrument(name = "whatsapp::send", skip_all, fields(template = %message.template), err(Display))]
  async fn send(&self, message: &TemplateMessage) -> Result<(), AppError> {
    let response = self
      .http
      .post(&self.endpoint)
      .bearer_auth(&self.access_token)
      .json(&template_payload(message, &self.language))
      .send()
      .await
      .map_err(|e| AppError::Delivery(format!("WhatsApp request failed: {}", e)))?;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      error!(%status, body = %text, "WhatsApp API rejected the message.");
      return Err(AppError::Delivery(format!("WhatsApp API returned {}", status)));
    }

    let parsed: SendResponse = response
      .json()
      .await
      .map_err(|e| AppError::Delivery(format!("Unexpected WhatsApp response: {}", e)))?;
    let message_id = parsed.messages.first().map(|m| m.id.as_str()).unwrap_or("unknown");
    info!(message_id, "WhatsApp message accepted.");
    Ok(())
  }
}

/// Stands in for WhatsApp when no access token is configured: the message
/// is written to the log instead of being sent.
#[derive(Debug, Clone, Default)]
pub struct LoggingMessenger;

#[async_trait]
impl Messenger for LoggingMessenger {
  async fn send(&self, message: &TemplateMessage) -> Result<(), AppError> {
    info!(
      to = %message.to,
      template = %message.template,
      parameters = ?message.parameters,
      "WhatsApp disabled; message logged instead of sent."
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn payload_follows_cloud_api_shape() {
    let message = TemplateMessage {
      to: "919876543210".to_string(),
      template: "login_otp".to_string(),
      parameters: vec!["123456".to_string()],
    };

    let payload = template_payload(&message, "en");

    assert_eq!(payload["messaging_product"], "whatsapp");
    assert_eq!(payload["to"], "919876543210");
    assert_eq!(payload["template"]["name"], "login_otp");
    assert_eq!(payload["template"]["language"]["code"], "en");
    assert_eq!(payload["template"]["components"][0]["parameters"][0]["text"], "123456");
  }
}

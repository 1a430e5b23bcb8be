// storefront/src/services/notifications.rs

//! Customer and store-owner WhatsApp notifications.

use crate::config::AppConfig;
use crate::db::AdminStore;
use crate::errors::{AppError, Result};
use crate::models::{Order, PhoneNumber};
use crate::services::messaging::{Messenger, TemplateMessage};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct Notifier {
  messenger: Arc<dyn Messenger>,
  admins: Arc<dyn AdminStore>,
  otp_template: String,
  order_template: String,
  owner_template: String,
  tracking_base_url: String,
  support_contact: String,
  fallback_owner_phone: Option<String>,
}

impl Notifier {
  pub fn new(config: &AppConfig, messenger: Arc<dyn Messenger>, admins: Arc<dyn AdminStore>) -> Self {
    Self {
      messenger,
      admins,
      otp_template: config.whatsapp.otp_template.clone(),
      order_template: config.whatsapp.order_template.clone(),
      owner_template: config.whatsapp.owner_template.clone(),
      tracking_base_url: format!("{}/track", config.app_base_url.trim_end_matches('/')),
      support_contact: config.support_contact.clone(),
      fallback_owner_phone: config.store_owner_phone.clone(),
    }
  }

  pub fn otp_message(&self, phone: &PhoneNumber, code: &str) -> TemplateMessage {
    TemplateMessage {
      to: phone.whatsapp_recipient(),
      template: self.otp_template.clone(),
      parameters: vec![code.to_string()],
    }
  }

  pub fn order_confirmation(&self, order: &Order) -> Result<TemplateMessage> {
    let phone = PhoneNumber::parse(&order.customer_info.phone)?;
    Ok(TemplateMessage {
      to: phone.whatsapp_recipient(),
      template: self.order_template.clone(),
      parameters: vec![
        order.customer_info.name.clone(),
        order.order_code.clone(),
        order.item_summary(),
        format!("{}/{}", self.tracking_base_url, order.order_code),
        self.support_contact.clone(),
      ],
    })
  }

  pub fn owner_alert(&self, order: &Order, owner: &PhoneNumber) -> TemplateMessage {
    let customer = &order.customer_info;
    TemplateMessage {
      to: owner.whatsapp_recipient(),
      template: self.owner_template.clone(),
      parameters: vec![
        order.order_code.clone(),
        customer.name.clone(),
        customer.phone.clone(),
        format!("₹{}", order.totals.total_amount),
        order.payment_method.label().to_string(),
        format!("{} {}", customer.delivery_date.format("%d %b %Y"), customer.time_slot),
      ],
    }
  }

  /// Number that receives new-order alerts: the admin's WhatsApp contact,
  /// else the configured fallback.
  pub async fn owner_phone(&self) -> Result<Option<PhoneNumber>> {
    let from_admin = self.admins.get().await?.and_then(|admin| admin.whatsapp_number);
    let Some(raw) = from_admin.or_else(|| self.fallback_owner_phone.clone()) else {
      return Ok(None);
    };
    match PhoneNumber::parse(&raw) {
      Ok(phone) => Ok(Some(phone)),
      Err(_) => {
        warn!("Store owner phone is not a valid mobile number; owner alerts are disabled.");
        Ok(None)
      }
    }
  }

  #[instrument(name = "notifications::send_otp", skip_all, fields(phone = %phone.masked()), err(Display))]
  pub async fn send_otp(&self, phone: &PhoneNumber, code: &str) -> Result<()> {
    self.messenger.send(&self.otp_message(phone, code)).await
  }

  #[instrument(name = "notifications::notify_customer", skip_all, fields(order_code = %order.order_code), err(Display))]
  pub async fn notify_customer(&self, order: &Order) -> Result<()> {
    let message = self.order_confirmation(order)?;
    self.messenger.send(&message).await?;
    info!("Customer order confirmation sent.");
    Ok(())
  }

  #[instrument(name = "notifications::notify_owner", skip_all, fields(order_code = %order.order_code), err(Display))]
  pub async fn notify_owner(&self, order: &Order) -> Result<()> {
    let Some(owner) = self.owner_phone().await? else {
      warn!("No store owner phone configured; skipping owner alert.");
      return Ok(());
    };
    self
      .messenger
      .send(&self.owner_alert(order, &owner))
      .await
      .map_err(|e| match e {
        AppError::Delivery(msg) => AppError::Delivery(format!("owner alert: {}", msg)),
        other => other,
      })?;
    info!("Store owner alert sent.");
    Ok(())
  }
}

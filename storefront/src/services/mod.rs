// storefront/src/services/mod.rs

pub mod auth_service;
pub mod catalog;
pub mod messaging;
pub mod notifications;
pub mod order_code;
pub mod payment_gateway;
pub mod rate_limit;

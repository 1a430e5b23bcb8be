// storefront/src/lib.rs

//! Bakehouse storefront backend: WhatsApp OTP sign-in, catalog and reviews,
//! order placement with Razorpay or cash on delivery, and the admin console
//! API.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;

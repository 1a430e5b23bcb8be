// storefront/src/models/mod.rs

//! Domain records and the business rules that only touch a single record.

pub mod admin;
pub mod order;
pub mod otp;
pub mod phone;
pub mod product;
pub mod review;
pub mod user;

pub use admin::Admin;
pub use order::{
  CustomerInfo, Order, OrderItem, OrderStatus, OrderTotals, OrderTracking, PaymentMethod, PaymentStatus, TrackingEntry,
};
pub use otp::Otp;
pub use phone::PhoneNumber;
pub use product::{Product, ProductFilter, ProductPage};
pub use review::Review;
pub use user::{Address, User};

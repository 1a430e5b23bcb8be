// storefront/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::web::handlers::{
  admin_handlers, auth_handlers, order_handlers, payment_handlers, product_handlers, user_handlers,
};

const JSON_BODY_LIMIT: usize = 256 * 1024;

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Malformed bodies and query strings answer with the same JSON error shape
/// as every other validation failure.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into()),
    )
    .app_data(
      web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid query string: {}", err)).into()),
    )
    .app_data(
      web::PathConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid path: {}", err)).into()),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);

  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/send-otp", web::post().to(auth_handlers::send_otp_handler))
          .route("/verify-otp", web::post().to(auth_handlers::verify_otp_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      .service(
        web::scope("/user")
          .route("/profile", web::patch().to(user_handlers::update_profile_handler))
          .route("/addresses", web::get().to(user_handlers::list_addresses_handler))
          .route("/addresses", web::post().to(user_handlers::add_address_handler))
          .route("/addresses/{address_id}", web::delete().to(user_handlers::delete_address_handler))
          .route("/orders", web::get().to(user_handlers::list_my_orders_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product}", web::get().to(product_handlers::get_product_handler))
          .route("/{product}/reviews", web::get().to(product_handlers::list_reviews_handler))
          .route("/{product}/reviews", web::post().to(product_handlers::create_review_handler)),
      )
      .service(
        web::scope("/reviews")
          .route("/{review_id}/helpful", web::post().to(product_handlers::mark_helpful_handler))
          .route("/{review_id}/report", web::post().to(product_handlers::report_review_handler)),
      )
      .service(
        web::scope("/orders")
          .route("/create", web::post().to(order_handlers::create_order_handler))
          .route("/{order_code}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_code}", web::patch().to(order_handlers::update_order_handler)),
      )
      .service(
        web::scope("/payment")
          .route("/verify", web::post().to(payment_handlers::verify_payment_handler))
          .route("/cod", web::post().to(payment_handlers::confirm_cod_handler))
          .route("/cod-confirm", web::post().to(payment_handlers::confirm_cod_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/setup", web::post().to(admin_handlers::setup_handler))
          .route("/login", web::post().to(admin_handlers::login_handler))
          .route("/logout", web::post().to(admin_handlers::logout_handler))
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/products", web::post().to(admin_handlers::create_product_handler))
          .route("/products/{product}", web::patch().to(admin_handlers::update_product_handler))
          .route("/products/{product}", web::delete().to(admin_handlers::delete_product_handler))
          .route("/reviews/{review_id}", web::patch().to(admin_handlers::moderate_review_handler))
          .route("/reviews/{review_id}", web::delete().to(admin_handlers::delete_review_handler)),
      ),
  );
}

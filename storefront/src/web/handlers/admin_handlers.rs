// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::product::{NewProduct, ProductUpdate};
use crate::models::{Admin, OrderStatus, PhoneNumber, Product};
use crate::services::auth_service::{self, removal_cookie, session_cookie, SessionRole};
use crate::services::catalog::{find_product, find_review, refresh_product_rating};
use crate::state::AppState;
use crate::web::extractors::AdminSession;

const DEFAULT_ORDER_PAGE_SIZE: i64 = 20;
const MAX_ORDER_PAGE_SIZE: i64 = 100;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminSetupPayload {
  pub email: String,
  pub password: String,
  pub whatsapp_number: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AdminLoginPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct AdminOrdersQuery {
  pub status: Option<String>,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReviewModerationPayload {
  pub is_approved: bool,
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
  let email = raw.trim().to_lowercase();
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
    _ => Err(AppError::Validation("Please enter a valid email address".to_string())),
  }
}

/// One-time creation of the store's admin account.
#[instrument(name = "handler::admin_setup", skip_all)]
pub async fn setup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AdminSetupPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if app_state.stores.admins.get().await?.is_some() {
    return Err(AppError::Conflict("Admin account already exists".to_string()));
  }

  let email = normalize_email(&payload.email)?;
  let whatsapp_number = match payload.whatsapp_number.as_deref().map(str::trim) {
    Some(raw) if !raw.is_empty() => Some(PhoneNumber::parse(raw)?.as_str().to_string()),
    _ => None,
  };
  let password_hash = auth_service::hash_password(&payload.password)?;

  let now = Utc::now();
  let admin = Admin {
    id: Uuid::new_v4(),
    email,
    password_hash,
    whatsapp_number,
    created_at: now,
    updated_at: now,
  };
  app_state.stores.admins.create(&admin).await?;
  info!(admin_id = %admin.id, "Admin account created.");
  Ok(HttpResponse::Created().json(json!({ "success": true, "admin": admin })))
}

#[instrument(name = "handler::admin_login", skip_all)]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AdminLoginPayload>,
) -> Result<HttpResponse, AppError> {
  let invalid = || AppError::Auth("Invalid email or password".to_string());
  let admin = app_state.stores.admins.get().await?.ok_or_else(invalid)?;

  let email_matches = admin.email == req_payload.email.trim().to_lowercase();
  if !email_matches || !auth_service::verify_password(&admin.password_hash, &req_payload.password)? {
    warn!("Admin login rejected.");
    return Err(invalid());
  }

  let token = auth_service::issue_session_token(&app_state.config.jwt_secret, admin.id, SessionRole::Admin)?;
  info!(admin_id = %admin.id, "Admin signed in.");
  Ok(
    HttpResponse::Ok()
      .cookie(session_cookie(SessionRole::Admin, token, app_state.config.cookie_secure))
      .json(json!({ "success": true, "admin": admin })),
  )
}

#[instrument(name = "handler::admin_logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok()
    .cookie(removal_cookie(SessionRole::Admin, app_state.config.cookie_secure))
    .json(json!({ "success": true }))
}

#[instrument(name = "handler::admin_orders", skip(app_state))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
  query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let status = match query.status.as_deref().map(str::trim) {
    None | Some("") | Some("all") => None,
    Some(raw) => Some(raw.parse::<OrderStatus>()?),
  };
  let page = query.page.unwrap_or(1).max(1);
  let limit = query.limit.unwrap_or(DEFAULT_ORDER_PAGE_SIZE).clamp(1, MAX_ORDER_PAGE_SIZE);

  let orders = app_state.stores.orders.list(status, limit, (page - 1) * limit).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders, "page": page, "limit": limit })))
}

#[instrument(name = "handler::admin_create_product", skip(app_state, req_payload))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
  req_payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = Product::create(req_payload.into_inner(), Utc::now())?;
  app_state.stores.products.insert(&product).await?;
  info!(product_id = %product.id, slug = %product.slug, "Product created.");
  Ok(HttpResponse::Created().json(json!({ "success": true, "product": product })))
}

#[instrument(name = "handler::admin_update_product", skip(app_state, req_payload))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
  path: web::Path<String>,
  req_payload: web::Json<ProductUpdate>,
) -> Result<HttpResponse, AppError> {
  let mut product = find_product(&app_state.stores, &path).await?;
  product.apply_update(req_payload.into_inner(), Utc::now())?;
  app_state.stores.products.update(&product).await?;
  info!(product_id = %product.id, "Product updated.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

#[instrument(name = "handler::admin_delete_product", skip(app_state))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product = find_product(&app_state.stores, &path).await?;
  app_state.stores.products.delete(product.id).await?;
  info!(product_id = %product.id, "Product deleted.");
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[instrument(name = "handler::admin_moderate_review", skip(app_state, req_payload))]
pub async fn moderate_review_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
  path: web::Path<Uuid>,
  req_payload: web::Json<ReviewModerationPayload>,
) -> Result<HttpResponse, AppError> {
  let stores = &app_state.stores;
  let review = stores
    .reviews
    .set_approval(path.into_inner(), req_payload.is_approved, Utc::now())
    .await?;
  refresh_product_rating(stores, review.product_id).await?;
  info!(review_id = %review.id, is_approved = review.is_approved, "Review moderated.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "review": review })))
}

#[instrument(name = "handler::admin_delete_review", skip(app_state))]
pub async fn delete_review_handler(
  app_state: web::Data<AppState>,
  _admin: AdminSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let stores = &app_state.stores;
  let review = find_review(stores, path.into_inner()).await?;
  stores.reviews.delete(review.id).await?;
  refresh_product_rating(stores, review.product_id).await?;
  info!(review_id = %review.id, "Review deleted.");
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

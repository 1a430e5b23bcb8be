// storefront/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::NewAddress;
use crate::models::User;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct ProfileUpdatePayload {
  pub name: Option<String>,
  pub email: Option<String>,
}

async fn load_user(app_state: &AppState, user_id: Uuid) -> Result<User, AppError> {
  app_state
    .stores
    .users
    .find_by_id(user_id)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists".to_string()))
}

#[instrument(name = "handler::update_profile", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ProfileUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let mut user = load_user(&app_state, auth_user.user_id).await?;
  user.update_profile(payload.name, payload.email, Utc::now())?;
  app_state.stores.users.update(&user).await?;
  info!("Profile updated.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "user": user })))
}

#[instrument(name = "handler::list_addresses", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn list_addresses_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = load_user(&app_state, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "addresses": user.addresses })))
}

#[instrument(name = "handler::add_address", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn add_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<NewAddress>,
) -> Result<HttpResponse, AppError> {
  let mut user = load_user(&app_state, auth_user.user_id).await?;
  let address = user.add_address(req_payload.into_inner(), Utc::now())?.clone();
  app_state.stores.users.update(&user).await?;
  info!(address_id = %address.id, "Address saved.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "address": address,
    "addresses": user.addresses,
  })))
}

#[instrument(name = "handler::delete_address", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address_id = path.into_inner();
  let mut user = load_user(&app_state, auth_user.user_id).await?;
  user.remove_address(address_id, Utc::now())?;
  app_state.stores.users.update(&user).await?;
  info!(%address_id, "Address removed.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "addresses": user.addresses })))
}

#[instrument(name = "handler::my_orders", skip_all, fields(user_id = %auth_user.user_id))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.stores.orders.list_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::review::NewReview;
use crate::models::{ProductFilter, ProductPage, Review};
use crate::services::catalog::{find_product, find_review, refresh_product_rating};
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, OptionalUser};

#[instrument(name = "handler::list_products", skip_all)]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProductFilter>,
) -> Result<HttpResponse, AppError> {
  let filter = query.into_inner();
  let (products, total) = app_state.stores.products.list(&filter).await?;
  info!(total, returned = products.len(), "Catalog listed.");
  Ok(HttpResponse::Ok().json(ProductPage::new(products, total, &filter)))
}

#[instrument(name = "handler::get_product", skip(app_state))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product = find_product(&app_state.stores, &path).await?;
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

#[instrument(name = "handler::list_reviews", skip(app_state))]
pub async fn list_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product = find_product(&app_state.stores, &path).await?;
  let reviews = app_state.stores.reviews.list_approved(product.id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "reviews": reviews,
    "ratingAverage": product.rating_average,
    "reviewCount": product.review_count,
  })))
}

/// Guests may review too; a signed-in customer with a delivered order for the
/// product gets the verified-purchase badge.
#[instrument(name = "handler::create_review", skip(app_state, req_payload))]
pub async fn create_review_handler(
  app_state: web::Data<AppState>,
  session: OptionalUser,
  path: web::Path<String>,
  req_payload: web::Json<NewReview>,
) -> Result<HttpResponse, AppError> {
  let stores = &app_state.stores;
  let product = find_product(stores, &path).await?;

  let (is_verified_purchase, fallback_author) = match session.0 {
    Some(user_id) => {
      let verified = stores.orders.has_delivered_product(user_id, product.id).await?;
      let name = stores.users.find_by_id(user_id).await?.and_then(|u| u.name);
      (verified, name)
    }
    None => (false, None),
  };

  let review = Review::write(
    product.id,
    session.0,
    fallback_author,
    req_payload.into_inner(),
    is_verified_purchase,
    Utc::now(),
  )?;
  stores.reviews.insert(&review).await?;
  let (rating_average, review_count) = refresh_product_rating(stores, product.id).await?;

  info!(review_id = %review.id, product_id = %product.id, is_verified_purchase, "Review posted.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "review": review,
    "ratingAverage": rating_average,
    "reviewCount": review_count,
  })))
}

#[instrument(name = "handler::mark_review_helpful", skip(app_state))]
pub async fn mark_helpful_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let review_id = path.into_inner();
  let stores = &app_state.stores;
  let voted = stores.reviews.add_helpful_vote(review_id, auth_user.user_id, Utc::now()).await?;
  let counted = voted.is_some();
  let review = match voted {
    Some(review) => review,
    None => find_review(stores, review_id).await?,
  };
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "counted": counted,
    "helpfulCount": review.helpful_count,
  })))
}

#[instrument(name = "handler::report_review", skip(app_state))]
pub async fn report_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let stores = &app_state.stores;
  let reported = stores.reviews.add_report(path.into_inner(), auth_user.user_id, Utc::now()).await?;
  let counted = reported.is_some();
  if let Some(review) = reported.filter(|r| !r.is_approved) {
    info!(review_id = %review.id, report_count = review.report_count, "Review hidden after repeated reports.");
    refresh_product_rating(stores, review.product_id).await?;
  }
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "counted": counted,
    "message": "Thanks, the review has been reported",
  })))
}

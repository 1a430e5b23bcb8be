// storefront/src/main.rs

use bakehouse_storefront::config::AppConfig;
use bakehouse_storefront::db::{self, seed};
use bakehouse_storefront::errors::AppError;
use bakehouse_storefront::state::{AppState, Integrations};
use bakehouse_storefront::web::configure_app_routes;

use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn startup_error(stage: &str, err: AppError) -> io::Error {
  tracing::error!(error = %err, stage, "Server startup failed.");
  io::Error::new(io::ErrorKind::Other, format!("{}: {}", stage, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Bakehouse storefront server...");

  let app_config = Arc::new(AppConfig::from_env().map_err(|e| startup_error("configuration", e))?);

  let stores = db::connect(&app_config)
    .await
    .map_err(|e| startup_error("database", e))?;

  if app_config.seed_db {
    seed::seed_catalog(&stores)
      .await
      .map_err(|e| startup_error("seed", e))?;
  }

  let integrations = Integrations::from_config(&app_config).map_err(|e| startup_error("integrations", e))?;
  let app_state = AppState::new(app_config.clone(), stores, integrations);

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}

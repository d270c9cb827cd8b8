pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod payment;
pub mod telemetry;
pub mod validation;

use std::sync::Arc;

use actix_web::{web, HttpRequest};

use crate::auth::TokenService;
use crate::config::Settings;
use crate::db::{Store, StoreResult};
use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;
use crate::payment::PaymentGateway;

/// Shared by every worker. Collaborators sit behind traits so the binary
/// wires PostgreSQL, Stripe and SMTP while tests wire in-memory fakes.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Runs a store operation on the blocking thread pool.
    pub async fn db<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&dyn Store) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(web::block(move || op(store.as_ref())).await??)
    }
}

/// Body, path and query extraction failures all surface as validation
/// errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req: &HttpRequest| ApiError::Validation(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req: &HttpRequest| ApiError::Validation(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req: &HttpRequest| ApiError::Validation(err.to_string()).into())
}

/// The full `/v1` route table.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        .service(
            web::scope("/v1")
                .service(web::scope("/customers").configure(handlers::customers::routes))
                .service(web::scope("/users").configure(handlers::users::routes))
                .service(web::scope("/categories").configure(handlers::categories::routes))
                .service(web::scope("/subcategories").configure(handlers::subcategories::routes))
                .service(web::scope("/listings").configure(handlers::listings::routes))
                .service(web::scope("/orders").configure(handlers::orders::routes))
                .route(
                    "/create-payment-intent",
                    web::post().to(handlers::payments::create_payment_intent),
                ),
        );
}

//! HTTP handlers for the dispatch API.
//!
//! Bleeter posting, account management and the liveness check.

pub mod bleeter;
pub mod health;
pub mod user;

use actix_web::web;

use crate::error::{json_error_handler, query_error_handler};

/// Registers every route of the API.
///
/// Body and query extraction failures are rendered as `validationFailed` API errors.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/health", web::get().to(health::health_check))
        .configure(bleeter::configure_bleeter_routes)
        .configure(user::configure_user_routes);
}

//! Liveness endpoint for monitoring and orchestration.

use actix_web::{HttpResponse, Responder};

/// Returns `{ "status": "ok", "version": "<crate version>" }`.
///
/// No authentication and no store access.
#[tracing::instrument]
pub async fn health_check() -> impl Responder {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

//! Library entry point for the dispatch backend.
//!
//! Exports all core modules for use in integration tests and by the main binary.

pub mod auth_middleware;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use auth_middleware::AuthMiddleware;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use events::{EventBus, SocketEvent};
pub use logging::{get_subscriber, init_subscriber};
pub use models::AppState;
pub use repository::postgres::PgStore;

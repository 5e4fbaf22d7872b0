//! Database connection utilities for the dispatch backend.
//!
//! Provides a function to create a connection pool to the Postgres database and to
//! apply the bundled migrations.

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::config::Config;

/// Establishes a connection pool to the Postgres database named by `config.database_url`.
///
/// # Returns
/// A [`PgPool`] instance for use with SQLx queries.
pub async fn connect_pg_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
}

/// Applies the migrations under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

//! Runtime configuration loaded from environment variables.
//!
//! `.env` is read by `dotenv` in `main` before [`Config::from_env`] runs.

use std::{env, path::PathBuf};

use anyhow::Context;
use time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string (`DATABASE_URL`)
    pub database_url: String,
    /// Listen address (`BIND_ADDRESS`, default `127.0.0.1:8080`)
    pub bind_address: String,
    /// Root of the public upload directory (`PUBLIC_DIR`, default `public`)
    pub public_dir: PathBuf,
    /// Whether the deployment runs on the hosted cloud (`CLOUD_ENABLED`)
    pub cloud_enabled: bool,
    /// Marks preference cookies `Secure` (`SECURE_COOKIES`)
    pub secure_cookies: bool,
    /// Pool size (`DB_MAX_CONNECTIONS`, default 5)
    pub db_max_connections: u32,
    /// Lifetime of preference cookies (`SESSION_COOKIE_MAX_AGE`, humantime, default `12h`)
    pub cookie_max_age: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            bind_address: "127.0.0.1:8080".to_string(),
            public_dir: PathBuf::from("public"),
            cloud_enabled: false,
            secure_cookies: false,
            db_max_connections: 5,
            cookie_max_age: Duration::hours(12),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Fails when `DATABASE_URL` is missing or a value cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_address = env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address);
        let public_dir = env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.public_dir);
        let cloud_enabled = parse_flag("CLOUD_ENABLED")?;
        let secure_cookies = parse_flag("SECURE_COOKIES")?;
        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {raw}"))?,
            Err(_) => defaults.db_max_connections,
        };
        let cookie_max_age = match env::var("SESSION_COOKIE_MAX_AGE") {
            Ok(raw) => parse_cookie_max_age(&raw)?,
            Err(_) => defaults.cookie_max_age,
        };

        Ok(Self {
            database_url,
            bind_address,
            public_dir,
            cloud_enabled,
            secure_cookies,
            db_max_connections,
            cookie_max_age,
        })
    }
}

/// Parses a humantime duration such as `12h` into a cookie lifetime.
fn parse_cookie_max_age(raw: &str) -> anyhow::Result<Duration> {
    let parsed = humantime::parse_duration(raw)
        .with_context(|| format!("SESSION_COOKIE_MAX_AGE is not a duration: {raw}"))?;
    Duration::try_from(parsed)
        .with_context(|| format!("SESSION_COOKIE_MAX_AGE is too large: {raw}"))
}

fn parse_flag(name: &str) -> anyhow::Result<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            other => anyhow::bail!("{name} must be a boolean, got {other}"),
        },
        Err(_) => Ok(false),
    }
}

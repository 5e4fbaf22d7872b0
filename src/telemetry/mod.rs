//! Request-level telemetry.
//!
//! - Request/response logging middleware
//! - Query string redaction for logged URLs
//! - Latency categories attached to every response log

pub mod middleware;

pub use middleware::RequestLoggingMiddleware;

/// Query parameter names whose values never reach the logs.
const SENSITIVE_PARAMS: [&str; 6] = [
    "password",
    "token",
    "secret",
    "access_token",
    "refresh_token",
    "session",
];

/// Replaces the values of sensitive query parameters with `[REDACTED]`.
pub fn redact_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SENSITIVE_PARAMS.contains(&key.to_ascii_lowercase().as_str()) => {
                format!("{key}=[REDACTED]")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Buckets a request duration for dashboards.
pub fn categorize_performance(duration_ms: u64) -> &'static str {
    match duration_ms {
        0..=100 => "EXCELLENT",
        101..=500 => "GOOD",
        501..=2000 => "ACCEPTABLE",
        2001..=5000 => "SLOW",
        _ => "CRITICAL",
    }
}

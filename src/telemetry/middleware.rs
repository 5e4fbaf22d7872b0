//! Request logging middleware for HTTP request/response tracking.
//!
//! Logs every request with method, path, redacted query string, status code,
//! timing and a generated request id. Status code picks the log level.

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use futures::future::{Ready, ok};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use uuid::Uuid;

use super::{categorize_performance, redact_query};

const SLOW_REQUEST_MS: u64 = 2000;

#[derive(Clone, Default)]
pub struct RequestLoggingMiddleware;

impl RequestLoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLoggingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggingService { service })
    }
}

pub struct RequestLoggingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();

        let method = req.method().to_string();
        let path = req.path().to_string();
        let query = redact_query(req.query_string());
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!(
            %request_id,
            %method,
            %path,
            %query,
            %remote_addr,
            "Incoming request"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let duration_ms = start_time.elapsed().as_millis() as u64;
            let status_code = response.status().as_u16();
            let performance = categorize_performance(duration_ms);

            match status_code {
                500..=599 => tracing::error!(
                    %request_id, %method, %path, status_code, duration_ms, performance,
                    "Request failed"
                ),
                400..=499 => tracing::warn!(
                    %request_id, %method, %path, status_code, duration_ms, performance,
                    "Request rejected"
                ),
                _ => tracing::info!(
                    %request_id, %method, %path, status_code, duration_ms, performance,
                    "Request completed"
                ),
            }

            if duration_ms > SLOW_REQUEST_MS {
                tracing::warn!(
                    %request_id,
                    %method,
                    %path,
                    duration_ms,
                    threshold_ms = SLOW_REQUEST_MS,
                    "Slow request detected"
                );
            }

            Ok(response)
        })
    }
}

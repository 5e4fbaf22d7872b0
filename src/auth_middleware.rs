//! Authentication extractor resolving the caller's session to an [`Account`].
//!
//! # Overview
//! [`AuthMiddleware`] is an Actix Web extractor. It reads the access token from the
//! `snaily-cad-session` cookie, falling back to an `Authorization: Bearer` header,
//! and resolves it through [`AccountRepository::find_by_session`](crate::repository::AccountRepository::find_by_session).
//!
//! # Usage
//! In handlers, add `user: AuthMiddleware` as an argument to receive the authenticated account.
//!
//! # Errors
//! Returns 401 Unauthorized if the token is missing, unknown or expired.

use std::ops::Deref;

use actix_web::{FromRequest, HttpRequest, web};
use futures::future::BoxFuture;
use tracing::Span;

use crate::{AppState, error::ApiError, models::Account, services::cookies::ACCESS_TOKEN_COOKIE};

/// Extractor carrying the authenticated account.
#[derive(Debug, Clone)]
pub struct AuthMiddleware(pub Account);

impl Deref for AuthMiddleware {
    type Target = Account;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Pulls the access token from the session cookie or the `Authorization` header.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthMiddleware {
    type Error = ApiError;
    type Future = BoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let app_state = req.app_data::<web::Data<AppState>>().cloned();
        let token = session_token(req);

        Box::pin(async move {
            let app_state = app_state
                .ok_or_else(|| ApiError::Internal("AppState missing".to_string()))?;

            let token = token.ok_or_else(|| {
                tracing::debug!("No session token present in request");
                ApiError::Unauthorized("noSession")
            })?;

            let account = app_state
                .accounts
                .find_by_session(&token)
                .await?
                .ok_or_else(|| {
                    tracing::warn!("Session token did not resolve to an account");
                    ApiError::Unauthorized("invalidSession")
                })?;

            tracing::debug!(user_id = %account.id, "User authenticated");
            Span::current().record("user_id", account.id.to_string());
            Ok(AuthMiddleware(account))
        })
    }
}

//! Bleeter profile endpoint.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use validator::Validate;

use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::{ApiError, ApiResult},
    models::ProfileInput,
};

#[derive(Debug, Deserialize, Validate)]
pub struct BleeterProfilePayload {
    #[validate(length(min = 1, max = 255))]
    pub handle: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
}

/// Lowercases a handle and strips whitespace and a leading `@`.
pub fn normalize_handle(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('@')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Creates or updates the caller's bleeter profile.
///
/// # HTTP Method
/// `POST /bleeter/new-experience/profile`
///
/// # Request Body (JSON)
/// ```json
/// { "handle": "CountySheriff", "name": "County Sheriff", "bio": "Official account" }
/// ```
///
/// # Behavior
/// - The handle is stored normalized (`countysheriff`)
/// - `400 handleTaken` when another user's profile holds the handle
/// - Submitting the current handle again is a plain update
/// - On first creation the caller's posts without a creator are attached
#[tracing::instrument(skip(user, app_state, payload), fields(user_id = %user.id))]
pub async fn upsert_profile(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    payload: web::Json<BleeterProfilePayload>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let payload = payload.into_inner();

    let handle = normalize_handle(&payload.handle);
    if handle.is_empty() {
        return Err(ApiError::BadRequest("invalidHandle"));
    }

    let outcome = app_state
        .profiles
        .upsert(
            user.id,
            ProfileInput {
                handle,
                name: payload.name,
                bio: payload.bio,
            },
        )
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Bleeter profile upsert rejected"))?;

    tracing::info!(
        profile_id = %outcome.profile.id,
        handle = %outcome.profile.handle,
        created = outcome.created,
        "Saved bleeter profile"
    );
    Ok(HttpResponse::Ok().json(outcome.profile))
}

//! Password change endpoint.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use validator::Validate;

use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::{ApiError, ApiResult},
    services::password::{hash_password_blocking, verify_password_blocking},
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    pub current_password: Option<String>,
    #[validate(length(min = 8, max = 255))]
    pub new_password: String,
    #[validate(length(min = 8, max = 255))]
    pub confirm_password: String,
}

/// Changes the caller's password.
///
/// # HTTP Method
/// `POST /user/password`
///
/// # Request Body (JSON)
/// ```json
/// { "currentPassword": "old-secret", "newPassword": "new-secret", "confirmPassword": "new-secret" }
/// ```
///
/// # Behavior
/// - Accounts created through Discord or Steam without a local password may
///   set one without `currentPassword`
/// - Otherwise `currentPassword` is checked against the temporary password
///   when one is set, else the regular one
/// - The temporary password is cleared on success
///
/// # Error Responses
/// - `400 passwordsDoNotMatch`
/// - `400 currentPasswordRequired`
/// - `400 currentPasswordIncorrect`
#[tracing::instrument(skip(user, app_state, payload), fields(user_id = %user.id))]
pub async fn change_password(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    payload: web::Json<ChangePasswordPayload>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let payload = payload.into_inner();

    if payload.new_password != payload.confirm_password {
        return Err(ApiError::BadRequest("passwordsDoNotMatch"));
    }

    if !user.is_oauth_only() {
        let current = payload
            .current_password
            .filter(|p| !p.is_empty())
            .ok_or(ApiError::BadRequest("currentPasswordRequired"))?;

        let stored = user
            .temp_password_hash
            .clone()
            .unwrap_or_else(|| user.password_hash.clone());

        if !verify_password_blocking(current, stored).await? {
            tracing::info!("Rejected password change with incorrect current password");
            return Err(ApiError::BadRequest("currentPasswordIncorrect"));
        }
    }

    let hash = hash_password_blocking(payload.new_password).await?;
    app_state.accounts.update_password(user.id, &hash).await?;
    tracing::info!("Password changed");

    Ok(HttpResponse::Ok().json(true))
}

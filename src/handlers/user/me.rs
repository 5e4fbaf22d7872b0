//! Fetch-self endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::ApiResult,
    models::{Account, CadConfig},
};

/// The caller's account merged with the CAD configuration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    #[serde(flatten)]
    pub account: Account,
    pub cad: Option<CadConfig>,
    pub cloud_enabled: bool,
}

/// Returns the authenticated account.
///
/// # HTTP Method
/// `POST /user`
///
/// # Success Response (200 OK)
/// ```json
/// {
///   "id": "7f0c...",
///   "username": "dispatch",
///   "rank": "USER",
///   "isDarkTheme": true,
///   "cad": { "name": "County CAD", "features": {} },
///   "cloudEnabled": false
/// }
/// ```
///
/// Password hashes and the CAD API token are never part of the response.
#[tracing::instrument(skip(user, app_state), fields(user_id = %user.id))]
pub async fn get_authenticated_user(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let cad = app_state.cads.current().await?;

    Ok(HttpResponse::Ok().json(AuthenticatedUser {
        account: user.0,
        cad,
        cloud_enabled: app_state.config.cloud_enabled,
    }))
}

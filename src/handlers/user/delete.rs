//! Account deletion endpoint.

use actix_web::{HttpResponse, web};
use tracing::{info, instrument};

use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::{ApiError, ApiResult},
    models::Rank,
};

/// Permanently deletes the authenticated user's account.
///
/// # HTTP Method
/// `DELETE /user`
///
/// # Error Responses
/// - `400 cannotDeleteOwner`: the caller holds the `OWNER` rank
///
/// Returns `true` on success. Sessions and owned rows are removed with the account.
#[instrument(skip(app_state, user), fields(user_id = %user.id))]
pub async fn delete_account(
    app_state: web::Data<AppState>,
    user: AuthMiddleware,
) -> ApiResult<HttpResponse> {
    if user.rank == Rank::Owner {
        info!("Refused to delete owner account");
        return Err(ApiError::BadRequest("cannotDeleteOwner"));
    }

    app_state.accounts.delete(user.id).await?;
    info!("Account deleted");

    Ok(HttpResponse::Ok().json(true))
}

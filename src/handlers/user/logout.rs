//! Logout endpoint.
//!
//! Besides dropping the session, logging out takes the user's units off duty:
//! an on-duty officer or EMS/FD deputy has its status and call cleared, its
//! dispatch chat removed and its shift log closed, and a status event is
//! broadcast so connected dispatchers refresh the unit.

use actix_web::{HttpResponse, web};

use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::ApiResult,
    events::SocketEvent,
    models::UnitKind,
    services::cookies::{self, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
};

/// Logs the caller out.
///
/// # HTTP Method
/// `POST /user/logout`
///
/// Expires `snaily-cad-session` and `snaily-cad-refresh-token` and returns `true`.
#[tracing::instrument(skip(user, app_state), fields(user_id = %user.id))]
pub async fn logout(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    app_state.duty.remove_active_dispatcher(user.id).await?;
    app_state.accounts.delete_sessions(user.id).await?;

    for kind in [UnitKind::Officer, UnitKind::EmsFd] {
        let Some(unit) = app_state.duty.find_on_duty(user.id, kind).await? else {
            continue;
        };

        app_state.duty.end_shift(&unit).await?;
        app_state.events.emit(SocketEvent::unit_status(kind, unit.id));
        tracing::info!(unit_id = %unit.id, ?kind, "Took unit off duty on logout");
    }

    tracing::info!("User logged out");

    Ok(HttpResponse::Ok()
        .cookie(cookies::expired(ACCESS_TOKEN_COOKIE))
        .cookie(cookies::expired(REFRESH_TOKEN_COOKIE))
        .json(true))
}

//! User settings endpoint.
//!
//! Updates the caller's username and UI preferences and mirrors the theme and
//! locale into client-readable cookies.

use std::borrow::Cow;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::{ApiError, ApiResult},
    models::{SettingsUpdate, SoundSettingsUpdate, StatusViewMode, TableActionsAlignment},
    services::cookies::{self, DARK_THEME_COOKIE, LOCALE_COOKIE},
};

/// Partial settings payload. Only `username` is required.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUserPayload {
    #[validate(length(min = 3, max = 255), custom(function = "validate_username"))]
    pub username: String,
    pub is_dark_theme: Option<bool>,
    #[validate(length(min = 2, max = 10))]
    pub locale: Option<String>,
    pub status_view_mode: Option<StatusViewMode>,
    pub table_actions_alignment: Option<TableActionsAlignment>,
    pub developer_mode: Option<bool>,
    pub sound_settings: Option<SoundSettingsUpdate>,
}

/// Letters, digits, `_` and `.`; must end on a letter or digit.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    let ends_well = username
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphanumeric());

    if allowed && ends_well {
        Ok(())
    } else {
        Err(ValidationError::new("invalidUsername")
            .with_message(Cow::Borrowed("username may only contain letters, digits, '_' and '.'")))
    }
}

impl From<ChangeUserPayload> for SettingsUpdate {
    fn from(payload: ChangeUserPayload) -> Self {
        Self {
            username: payload.username,
            is_dark_theme: payload.is_dark_theme,
            locale: payload.locale,
            status_view_mode: payload.status_view_mode,
            table_actions_alignment: payload.table_actions_alignment,
            developer_mode: payload.developer_mode,
            sound_settings: payload.sound_settings,
        }
    }
}

/// Updates the authenticated user's settings.
///
/// # HTTP Method
/// `PATCH /user`
///
/// # Request Body (JSON)
/// ```json
/// {
///   "username": "dispatch.01",
///   "isDarkTheme": true,
///   "locale": "en",
///   "statusViewMode": "DOT_COLOR",
///   "soundSettings": { "panicButton": true, "speech": false }
/// }
/// ```
///
/// # Error Responses
/// - `400 usernameAlreadyTaken`: another account holds the username
/// - `400 validationFailed`: malformed fields
///
/// Sets `sn_isDarkTheme` and `sn_locale` on success and returns the updated account.
#[tracing::instrument(skip(user, app_state, payload), fields(user_id = %user.id))]
pub async fn patch_user(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    payload: web::Json<ChangeUserPayload>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let payload = payload.into_inner();

    if let Some(existing) = app_state.accounts.find_by_username(&payload.username).await? {
        if existing.id != user.id {
            tracing::info!(username = %payload.username, "Username already taken");
            return Err(ApiError::BadRequest("usernameAlreadyTaken"));
        }
    }

    let updated = app_state
        .accounts
        .update_settings(user.id, payload.into())
        .await?;

    tracing::info!("Updated user settings");

    let config = &app_state.config;
    let mut response = HttpResponse::Ok();
    response.cookie(cookies::preference(
        DARK_THEME_COOKIE,
        updated.is_dark_theme.to_string(),
        config,
    ));
    if let Some(locale) = &updated.locale {
        response.cookie(cookies::preference(LOCALE_COOKIE, locale.clone(), config));
    }

    Ok(response.json(updated))
}

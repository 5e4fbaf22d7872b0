//! Bleeter post endpoints: feed, read, create, update and delete.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::find_owned_post;
use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::{ApiError, ApiResult},
    models::{Page, PostInput},
};

/// Posts returned per feed page.
pub const FEED_PAGE_SIZE: i64 = 35;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedQuery {
    pub skip: i64,
    pub include_all: bool,
}

/// Body of `POST /bleeter` and `PUT /bleeter/{id}`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BleeterPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub body: Option<String>,
    /// Rich-text document produced by the editor
    pub body_data: Option<serde_json::Value>,
}

impl From<BleeterPayload> for PostInput {
    fn from(payload: BleeterPayload) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            body_data: payload.body_data,
        }
    }
}

/// Lists posts newest first.
///
/// # HTTP Method
/// `GET /bleeter?skip=0&includeAll=false`
///
/// # Success Response (200 OK)
/// ```json
/// {
///   "posts": [{ "id": "...", "title": "...", "user": { "username": "..." }, "creator": null }],
///   "totalCount": 1,
///   "userBleeterProfile": null
/// }
/// ```
#[tracing::instrument(skip(user, app_state), fields(user_id = %user.id))]
pub async fn list_posts(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    query: web::Query<FeedQuery>,
) -> ApiResult<HttpResponse> {
    let page = (!query.include_all).then(|| Page {
        skip: query.skip.max(0),
        take: FEED_PAGE_SIZE,
    });

    let feed = app_state.posts.feed(user.id, page).await?;

    tracing::debug!(
        total_count = feed.total_count,
        returned = feed.posts.len(),
        "Fetched bleeter feed"
    );
    Ok(HttpResponse::Ok().json(feed))
}

/// `GET /bleeter/{id}`
#[tracing::instrument(skip(user, app_state), fields(user_id = %user.id))]
pub async fn get_post(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let post = app_state
        .posts
        .find(path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("notFound"))?;

    Ok(HttpResponse::Ok().json(post))
}

/// Creates a post, attributing it to the caller's profile when one exists.
///
/// # HTTP Method
/// `POST /bleeter`
///
/// # Request Body (JSON)
/// ```json
/// { "title": "Road closed", "body": "I-5 north is closed", "bodyData": null }
/// ```
#[tracing::instrument(skip(user, app_state, payload), fields(user_id = %user.id))]
pub async fn create_post(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    payload: web::Json<BleeterPayload>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;

    let creator_id = app_state
        .profiles
        .find_by_user(user.id)
        .await?
        .map(|profile| profile.id);

    let post = app_state
        .posts
        .create(user.id, creator_id, payload.into_inner().into())
        .await?;

    tracing::info!(post_id = %post.id, "Created bleeter post");
    Ok(HttpResponse::Ok().json(post))
}

/// `PUT /bleeter/{id}`, author only.
#[tracing::instrument(skip(user, app_state, payload), fields(user_id = %user.id))]
pub async fn update_post(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<BleeterPayload>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let post = find_owned_post(&app_state, path.into_inner(), user.id).await?;

    let updated = app_state
        .posts
        .update(post.post.id, payload.into_inner().into())
        .await?;

    tracing::info!(post_id = %updated.id, "Updated bleeter post");
    Ok(HttpResponse::Ok().json(updated))
}

/// `DELETE /bleeter/{id}`, author only. Removes the header image file as well.
#[tracing::instrument(skip(user, app_state), fields(user_id = %user.id))]
pub async fn delete_post(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let post = find_owned_post(&app_state, path.into_inner(), user.id).await?;

    app_state.posts.delete(post.post.id).await?;

    if let Some(image_id) = &post.post.image_id {
        if let Err(e) = app_state.images.remove(image_id).await {
            tracing::warn!(post_id = %post.post.id, %image_id, error = %e, "Failed to remove post image");
        }
    }

    tracing::info!(post_id = %post.post.id, "Deleted bleeter post");
    Ok(HttpResponse::Ok().json(true))
}

//! Bleeter handler module organization.
//!
//! Posts, header image uploads and author profiles. Every route requires a session.
//! Posts that exist but belong to someone else are reported as `404 notFound`,
//! exactly like posts that do not exist.

pub mod image;
pub mod posts;
pub mod profile;

use actix_web::web;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::PostWithAuthor,
};

pub use self::{image::*, posts::*, profile::*};

/// Registers all bleeter endpoints.
pub fn configure_bleeter_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bleeter")
            // Registered before `/{id}` so the literal segments win
            .route("/new-experience/profile", web::post().to(upsert_profile))
            .route("", web::get().to(list_posts))
            .route("", web::post().to(create_post))
            .route("/{id}", web::get().to(get_post))
            .route("/{id}", web::put().to(update_post))
            .route("/{id}", web::post().to(upload_post_image))
            .route("/{id}", web::delete().to(delete_post)),
    );
}

/// Loads a post only if `user_id` authored it.
pub(crate) async fn find_owned_post(
    app_state: &AppState,
    post_id: Uuid,
    user_id: Uuid,
) -> ApiResult<PostWithAuthor> {
    match app_state.posts.find(post_id).await? {
        Some(post) if post.post.user_id == user_id => Ok(post),
        Some(_) => {
            tracing::debug!(%post_id, %user_id, "Post belongs to another user");
            Err(ApiError::NotFound("notFound"))
        }
        None => Err(ApiError::NotFound("notFound")),
    }
}

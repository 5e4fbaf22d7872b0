//! Header image upload for bleeter posts.
//!
//! The image is validated before anything touches the disk. Encoding, the file
//! write and the record update are one unit: if the record update fails, the
//! freshly written file is removed again. Failures are logged with their cause
//! and reported to the caller as `uploadFailed`.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::StreamExt;
use uuid::Uuid;

use super::find_owned_post;
use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    error::{ApiError, ApiResult, UploadError},
    models::Post,
    services::image::{MAX_UPLOAD_BYTES, encode_for_web_blocking, is_allowed_image_type},
};

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Uploads or replaces a post's header image.
///
/// # HTTP Method
/// `POST /bleeter/{id}` with `multipart/form-data`, field `image`
///
/// # Error Responses
/// - `400 noImageProvided`: no `image` part or an empty one
/// - `400 invalidImageType`: MIME type outside png/gif/jpeg/webp
/// - `400 uploadFailed`: decoding, encoding, disk or store failure
/// - `404 notFound`: post absent or not authored by the caller
#[tracing::instrument(skip(user, app_state, payload), fields(user_id = %user.id))]
pub async fn upload_post_image(
    user: AuthMiddleware,
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
    mut payload: Multipart,
) -> ApiResult<HttpResponse> {
    let post = find_owned_post(&app_state, path.into_inner(), user.id).await?;
    let post_id = post.post.id;

    let raw = read_image_field(&mut payload)
        .await
        .map_err(|e| log_upload_failure(post_id, e))?;

    let updated = store_post_image(&app_state, post_id, raw)
        .await
        .map_err(|e| log_upload_failure(post_id, ApiError::Upload(e)))?;

    if let Some(previous) = post.post.image_id.as_deref() {
        if updated.image_id.as_deref() != Some(previous) {
            if let Err(e) = app_state.images.remove(previous).await {
                tracing::warn!(%post_id, image_id = %previous, error = %e, "Failed to remove replaced image");
            }
        }
    }

    tracing::info!(%post_id, image_id = ?updated.image_id, "Stored bleeter header image");
    Ok(HttpResponse::Ok().json(updated))
}

fn log_upload_failure(post_id: Uuid, err: ApiError) -> ApiError {
    if let ApiError::Upload(cause) = &err {
        tracing::error!(%post_id, error = %cause, cause = ?cause, "Bleeter image upload failed");
    }
    err
}

/// Reads the `image` part, rejecting disallowed MIME types before buffering.
async fn read_image_field(payload: &mut Multipart) -> ApiResult<Vec<u8>> {
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| UploadError::Multipart(e.to_string()))?;

        if field.name() != Some(IMAGE_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            }
            continue;
        }

        let mime = field.content_type().map(|m| m.essence_str().to_string());
        if !mime.as_deref().is_some_and(is_allowed_image_type) {
            tracing::debug!(mime = ?mime, "Rejected image with disallowed type");
            return Err(ApiError::BadRequest("invalidImageType"));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(UploadError::TooLarge(MAX_UPLOAD_BYTES).into());
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("noImageProvided"));
        }
        return Ok(bytes);
    }

    Err(ApiError::BadRequest("noImageProvided"))
}

/// Encodes, writes and records the image, removing the file again if the
/// record update fails.
async fn store_post_image(app_state: &AppState, post_id: Uuid, raw: Vec<u8>) -> Result<Post, UploadError> {
    let stem = format!("{post_id}-{}", Uuid::new_v4().simple());
    let encoded = encode_for_web_blocking(stem, raw).await?;

    let path = app_state.images.write(&encoded).await?;
    tracing::debug!(path = %path.display(), bytes = encoded.bytes.len(), "Wrote bleeter image");

    match app_state
        .posts
        .set_image(post_id, &encoded.file_name, &encoded.blur_data)
        .await
    {
        Ok(post) => Ok(post),
        Err(e) => {
            if let Err(cleanup) = app_state.images.remove(&encoded.file_name).await {
                tracing::warn!(
                    %post_id,
                    file = %encoded.file_name,
                    error = %cleanup,
                    "Failed to remove orphaned image after store failure"
                );
            }
            Err(e.into())
        }
    }
}

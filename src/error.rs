//! API error type shared by every handler.
//!
//! Handlers return `Result<HttpResponse, ApiError>`. Each variant maps to a status
//! code and a machine-readable `error` key; validation failures additionally carry
//! one key per rejected field.

use std::collections::BTreeMap;

use actix_web::{
    HttpRequest, HttpResponse, ResponseError,
    error::{JsonPayloadError, QueryPayloadError},
    http::StatusCode,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{repository::StoreError, services::password::PasswordError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource absent, or present but not owned by the caller.
    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Body or query string rejected before reaching the handler.
    #[error("{message}")]
    Malformed {
        message: String,
        missing_field: Option<String>,
    },

    /// Image upload failure. The cause is logged, the caller only sees `uploadFailed`.
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::HandleTaken => Self::BadRequest("handleTaken"),
            StoreError::UsernameTaken => Self::BadRequest("usernameAlreadyTaken"),
            StoreError::NotFound => Self::NotFound("notFound"),
            other => Self::Store(other),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Tagged causes of a failed image upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read multipart payload: {0}")]
    Multipart(String),

    #[error("image exceeds {0} bytes")]
    TooLarge(usize),

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to write image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to store image metadata: {0}")]
    Store(#[from] StoreError),

    #[error("image encoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, String>>,
}

impl ApiError {
    fn key(&self) -> &'static str {
        match self {
            Self::NotFound(key) | Self::BadRequest(key) | Self::Unauthorized(key) => key,
            Self::Validation(_) | Self::Malformed { .. } => "validationFailed",
            Self::Upload(_) => "uploadFailed",
            Self::Store(_) | Self::Internal(_) => "internalServerError",
        }
    }

    fn message(&self) -> String {
        match self {
            // Server-side details stay in the logs
            Self::Upload(_) => "Failed to upload image".to_string(),
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Flattens validator output into `field -> first error code`.
pub fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first()
                .map(|e| (field.to_string(), e.code.to_string()))
        })
        .collect()
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Validation(_) | Self::Malformed { .. } | Self::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Request failed with server error");
        }

        let errors = match self {
            Self::Validation(e) => Some(field_errors(e)),
            Self::Malformed {
                missing_field: Some(field),
                ..
            } => Some(BTreeMap::from([(field.clone(), "required".to_string())])),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.key(),
            message: self.message(),
            errors,
        })
    }
}

/// Extracts the field name from serde's "missing field `x`" message.
fn missing_field(message: &str) -> Option<String> {
    let (_, rest) = message.split_once("missing field `")?;
    rest.split_once('`').map(|(field, _)| field.to_string())
}

/// `JsonConfig` error handler rendering body errors in the API error shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let missing_field = match &err {
        JsonPayloadError::Deserialize(e) => missing_field(&e.to_string()),
        _ => None,
    };
    tracing::debug!(error = %err, "Rejected malformed JSON body");

    ApiError::Malformed {
        message: err.to_string(),
        missing_field,
    }
    .into()
}

/// `QueryConfig` error handler rendering query string errors in the API error shape.
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected malformed query string");

    ApiError::Malformed {
        missing_field: missing_field(&err.to_string()),
        message: err.to_string(),
    }
    .into()
}

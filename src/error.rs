use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Why a provider delivery was refused.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    #[error("Timestamp outside tolerance window")]
    StaleTimestamp,
    #[error("Invalid secret key")]
    InvalidKey,
    #[error("No matching signature found")]
    SignatureMismatch,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("{kind} without {field}")]
    MissingField { kind: String, field: &'static str },
}

/// Error taxonomy of the HTTP surface. Every variant renders `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("File size exceeds {limit_mb}MB limit")]
    PayloadTooLarge { limit_mb: usize },
    #[error("File type not allowed: {0}")]
    UnsupportedMediaType(String),
    #[error("Invalid webhook: {0}")]
    InvalidSignature(String),
    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found or access denied", what))
    }

    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Internal(format!("{}: {}", context, err))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            error!("{}", detail);
        }
        let message = self.to_string();
        HttpResponse::build(self.status_code()).json(ErrorBody { error: &message })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Not found".to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::InvalidSignature(err.to_string())
    }
}

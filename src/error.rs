// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::api::messages;
use crate::requests::validation::FieldError;
use crate::services::ServiceError;

/// HTTP API error with appropriate status codes and client-safe messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        errors: Vec<FieldError>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 415 Unsupported Media Type
    UnsupportedMediaType(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::UnsupportedMediaType(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// `{message}`, or `{message, errors}` for validation failures
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, errors } => json!({
                "message": message,
                "errors": errors,
            }),
            _ => json!({ "message": self.message() }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(errors: Vec<FieldError>) -> Self {
        ApiError::ValidationError {
            message: messages::ERROR_VALIDATION.to_string(),
            errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found() -> Self {
        ApiError::NotFound(messages::ERROR_NOT_FOUND.to_string())
    }

    pub fn internal_server_error() -> Self {
        ApiError::InternalServerError(messages::ERROR_INTERNAL_SERVER.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => ApiError::validation_error(errors),
            ServiceError::Auth(msg) => ApiError::unauthorized(msg),
            ServiceError::NotFound(detail) => {
                tracing::debug!("Not found: {}", detail);
                ApiError::not_found()
            }
            ServiceError::BusinessRule(msg) => ApiError::bad_request(msg),
            ServiceError::Conflict(detail) => {
                tracing::debug!("Conflict: {}", detail);
                ApiError::Conflict(messages::ERROR_ACCOUNT_EXISTS.to_string())
            }
            ServiceError::UnsupportedFile(mime) => {
                ApiError::UnsupportedMediaType(format!("Tipe file tidak didukung: {}", mime))
            }
            ServiceError::Unavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                ApiError::ServiceUnavailable(messages::ERROR_SERVICE_UNAVAILABLE.to_string())
            }
            ServiceError::Internal(detail) => {
                // Don't expose internal errors to clients
                tracing::error!("Internal error: {}", detail);
                ApiError::internal_server_error()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

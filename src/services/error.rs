use thiserror::Error;
use tracing::error;

use crate::attachments::AttachmentError;
use crate::auth::TokenError;
use crate::database::DatabaseError;
use crate::requests::validation::FieldError;

/// Domain error taxonomy shared by every service operation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed with {} errors", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) | DatabaseError::ForeignKeyViolation(msg) => {
                ServiceError::NotFound(msg)
            }
            DatabaseError::UniqueViolation(msg) => ServiceError::Conflict(msg),
            DatabaseError::Unavailable(msg) => ServiceError::Unavailable(msg),
            other => {
                error!("Database error: {}", other);
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<AttachmentError> for ServiceError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::UnsupportedType { mime, .. } => ServiceError::UnsupportedFile(mime),
            other => {
                error!("Attachment error: {}", other);
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(msg) => ServiceError::Auth(msg),
            other => {
                error!("Token error: {}", other);
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<bcrypt::BcryptError> for ServiceError {
    fn from(err: bcrypt::BcryptError) -> Self {
        error!("Password hashing failed: {}", err);
        ServiceError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Blocking task failed: {}", err);
        ServiceError::Internal(err.to_string())
    }
}

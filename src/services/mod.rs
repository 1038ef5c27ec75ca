pub mod auth_service;
pub mod error;

pub use auth_service::{AuthService, ChangePasswordRequest, LoginRequest, LoginResponse};
pub use error::ServiceError;

pub mod auth;
pub mod response;

pub use auth::{requester_auth, reviewer_auth, Caller};
pub use response::{ApiResponse, ApiResult};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::messages;
use crate::database::Backend;
use crate::handlers::form::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginRequest, LoginResponse};
use crate::AppState;

/// POST /api/v1/login/user
///
/// Body: `{email, password, notification_token?}`. A device token, when
/// given, is stored so status changes can be pushed to the requester.
pub async fn login_requester<S: Backend>(
    State(state): State<AppState<S>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let request = json_body(body)?;
    let response = state.auth.login_requester(request).await?;
    Ok(ApiResponse::success(messages::SUCCESS_LOGIN, response))
}

/// POST /api/v1/login/pengelola
pub async fn login_reviewer<S: Backend>(
    State(state): State<AppState<S>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let request = json_body(body)?;
    let response = state.auth.login_reviewer(request).await?;
    Ok(ApiResponse::success(messages::SUCCESS_LOGIN, response))
}

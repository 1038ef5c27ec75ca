use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::messages;
use crate::database::Backend;
use crate::handlers::form::json_body;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::services::ChangePasswordRequest;
use crate::AppState;

/// PUT /api/v1/change-password/{user|pengelola}
///
/// Mounted once in each protected group; the caller's kind decides which
/// account table is touched.
pub async fn change_password<S: Backend>(
    State(state): State<AppState<S>>,
    Caller(ctx): Caller,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<()> {
    let request = json_body(body)?;
    state.auth.change_password(&ctx, request).await?;
    Ok(ApiResponse::message(messages::SUCCESS_UPDATE))
}

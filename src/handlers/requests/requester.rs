use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;

use crate::api::messages;
use crate::database::Backend;
use crate::handlers::form::{parse_id, read_submission};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::requests::RequestKind;
use crate::AppState;

/// POST /api/v1/:kind
pub async fn create<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let submission = read_submission(kind, multipart).await?;
    let record = state.requests.create(&ctx, kind, submission).await?;
    Ok(ApiResponse::created(messages::SUCCESS_INSERT, record))
}

/// PUT /api/v1/:kind/:id
pub async fn update<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let submission = read_submission(kind, multipart).await?;
    let record = state.requests.update(&ctx, kind, id, submission).await?;
    Ok(ApiResponse::success(messages::SUCCESS_UPDATE, record))
}

/// DELETE /api/v1/:kind/:id
pub async fn remove<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    state.requests.delete(&ctx, kind, id).await?;
    Ok(ApiResponse::message(messages::SUCCESS_DELETE))
}

/// GET /api/v1/:kind/me
pub async fn list_own<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
) -> ApiResult<Vec<Value>> {
    let records = state.requests.list(&ctx, kind).await?;
    Ok(ApiResponse::success(messages::SUCCESS_GET_DATA, records))
}

/// GET /api/v1/:kind/me/:id
pub async fn show_own<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let record = state.requests.find_by_id(&ctx, kind, id).await?;
    Ok(ApiResponse::success(messages::SUCCESS_GET_DATA, record))
}

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::api::messages;
use crate::database::Backend;
use crate::handlers::form::{json_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::requests::RequestKind;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: String,
}

/// GET /api/v1/:kind
pub async fn list_all<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
) -> ApiResult<Vec<Value>> {
    let records = state.requests.list(&ctx, kind).await?;
    Ok(ApiResponse::success(messages::SUCCESS_GET_DATA, records))
}

/// GET /api/v1/:kind/:id
pub async fn show<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let record = state.requests.find_by_id(&ctx, kind, id).await?;
    Ok(ApiResponse::success(messages::SUCCESS_GET_DATA, record))
}

/// PATCH /api/v1/:kind/:id
pub async fn update_status<S: Backend>(
    State(state): State<AppState<S>>,
    Extension(kind): Extension<&'static RequestKind>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    let StatusUpdate { status } = json_body(body)?;
    state.requests.update_status(&ctx, kind, id, &status).await?;
    Ok(ApiResponse::message(messages::SUCCESS_UPDATE))
}

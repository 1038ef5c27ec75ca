use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::api::messages;
use crate::database::Backend;
use crate::error::ApiError;
use crate::handlers::form::query_params;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::requests::find_by_slug;
use crate::services::ServiceError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CountQuery {
    pub kind: Option<String>,
    pub group_by: Option<String>,
    pub year: Option<i32>,
}

/// GET /api/v1/permintaan and /api/v1/permintaan/me
///
/// Requesters only ever see their own records; the access context decides.
pub async fn count<S: Backend>(
    State(state): State<AppState<S>>,
    Caller(ctx): Caller,
    query: Result<Query<CountQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let query = query_params(query)?;
    let kind = match query.kind.as_deref().filter(|k| !k.is_empty()) {
        Some(slug) => Some(find_by_slug(slug).ok_or_else(|| {
            ApiError::from(ServiceError::validation("kind", format!("unknown request kind: {}", slug)))
        })?),
        None => None,
    };

    let data = match query.group_by.as_deref() {
        None | Some("") => {
            let totals = state.requests.count_totals(&ctx, kind).await?;
            serde_json::to_value(totals)
        }
        Some("bulan") => {
            let year = query.year.unwrap_or_else(|| Utc::now().year());
            let months = state.requests.count_per_month(&ctx, kind, year).await?;
            serde_json::to_value(months)
        }
        Some(other) => {
            return Err(ServiceError::validation(
                "group_by",
                format!("unsupported grouping: {}", other),
            )
            .into())
        }
    }
    .map_err(|e| {
        tracing::error!("Failed to serialize counts: {}", e);
        ApiError::internal_server_error()
    })?;

    Ok(ApiResponse::success(messages::SUCCESS_GET_DATA, data))
}

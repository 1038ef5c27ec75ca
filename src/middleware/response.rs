use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::messages;

/// Success envelope: `{message, data}`, with `data` omitted when there is none
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: &'static str,
    pub data: Option<T>,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: &'static str, data: T) -> Self {
        Self {
            message,
            data: Some(data),
            status_code: StatusCode::OK,
        }
    }

    /// 201 with the stored record
    pub fn created(message: &'static str, data: T) -> Self {
        Self {
            message,
            data: Some(data),
            status_code: StatusCode::CREATED,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &'static str) -> Self {
        Self {
            message,
            data: None,
            status_code: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match self.data.as_ref().map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": messages::ERROR_INTERNAL_SERVER })),
                )
                    .into_response();
            }
        };

        let envelope = match data {
            Some(data) => json!({ "message": self.message, "data": data }),
            None => json!({ "message": self.message }),
        };
        (self.status_code, Json::<Value>(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

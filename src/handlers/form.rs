use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use crate::api::messages;
use crate::error::ApiError;
use crate::requests::{RequestKind, Submission};

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(messages::ERROR_PAYLOAD_TOO_LARGE.to_string())
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// Split a multipart form into text fields and files for the kind's
/// attachment slots. Empty file parts are treated as "no file".
pub async fn read_submission(
    kind: &RequestKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Submission, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if kind.attachment(&name).is_some() {
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if !bytes.is_empty() {
                submission.files.insert(name, bytes.to_vec());
            }
        } else if field.file_name().is_none() {
            let text = field.text().await.map_err(multipart_error)?;
            submission.fields.insert(name, text);
        } else {
            debug!("Ignoring file part {} for {}", name, kind.slug);
        }
    }

    Ok(submission)
}

pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// A malformed id cannot name a stored record
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found())
}

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use crate::api::messages;
use crate::auth::{AccessContext, TokenService};
use crate::database::Backend;
use crate::error::ApiError;
use crate::types::PrincipalKind;
use crate::AppState;

/// Requester route group: verifies against the requester secret only
pub async fn requester_auth<S: Backend>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(&state.tokens, PrincipalKind::Requester, request, next).await
}

/// Reviewer route group: verifies against the reviewer secret only
pub async fn reviewer_auth<S: Backend>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(&state.tokens, PrincipalKind::Reviewer, request, next).await
}

async fn authenticate(
    tokens: &TokenService,
    kind: PrincipalKind,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers())
        .ok_or_else(|| ApiError::unauthorized(messages::ERROR_TOKEN_MISSING))?;

    let claims = tokens.verify(token, kind).map_err(|e| {
        debug!("Rejected {} token: {}", kind.as_str(), e);
        ApiError::unauthorized(messages::ERROR_TOKEN_INVALID)
    })?;

    request
        .extensions_mut()
        .insert(AccessContext::from_claims(claims, kind));

    Ok(next.run(request).await)
}

/// `Authorization: Bearer <token>`; anything else counts as missing
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The caller resolved by the group middleware
#[derive(Debug, Clone)]
pub struct Caller(pub AccessContext);

#[async_trait]
impl<St: Send + Sync> FromRequestParts<St> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessContext>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| {
                error!("Route reached without an access context: {}", parts.uri.path());
                ApiError::internal_server_error()
            })
    }
}

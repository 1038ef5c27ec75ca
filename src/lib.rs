pub mod api;
pub mod attachments;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notification;
pub mod requests;
pub mod services;
pub mod types;

#[cfg(test)]
pub mod testing;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{middleware::from_fn_with_state, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::PublicUrls;
use crate::attachments::AttachmentStore;
use crate::auth::{TokenError, TokenService};
use crate::config::AppConfig;
use crate::database::Backend;
use crate::notification::Notifier;
use crate::requests::LifecycleService;
use crate::services::AuthService;

/// Shared handler state, generic over the store backend
pub struct AppState<S: Backend> {
    pub requests: Arc<LifecycleService<S>>,
    pub auth: Arc<AuthService<S>>,
    pub tokens: Arc<TokenService>,
    pub store: S,
}

impl<S: Backend> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            auth: self.auth.clone(),
            tokens: self.tokens.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S: Backend> AppState<S> {
    /// Fails when the two JWT secrets are missing or identical
    pub fn new(store: S, config: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self, TokenError> {
        let tokens = Arc::new(TokenService::new(&config.security)?);
        let attachments = AttachmentStore::new(&config.storage.upload_dir);
        let urls = PublicUrls::from_config(&config.storage);

        Ok(Self {
            requests: Arc::new(LifecycleService::new(store.clone(), attachments, notifier, urls)),
            auth: Arc::new(AuthService::new(
                store.clone(),
                tokens.clone(),
                config.security.bcrypt_cost,
            )),
            tokens,
            store,
        })
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The full router: `/`, `/health` and the three `/api/v1` groups
pub fn app<S: Backend>(state: AppState<S>, config: &AppConfig) -> Router {
    let requester = handlers::requester_routes(&state)
        .route_layer(from_fn_with_state(state.clone(), middleware::requester_auth::<S>));
    let reviewer = handlers::reviewer_routes(&state)
        .route_layer(from_fn_with_state(state.clone(), middleware::reviewer_auth::<S>));

    let api = handlers::public_routes::<S>().merge(requester).merge(reviewer);

    Router::new()
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health::<S>))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config.security.cors_origins))
        .with_state(state)
}

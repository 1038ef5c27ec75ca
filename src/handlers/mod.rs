// Route handlers grouped by who may call them:
// public (no token), requester token, reviewer token.
// Request-kind handlers are shared across all six kinds.
pub mod account;
pub mod counts;
pub mod form;
pub mod public;
pub mod requests;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::services::ServeDir;

use crate::database::Backend;
use crate::types::AttachmentCategory;
use crate::AppState;

pub fn public_routes<S: Backend>() -> Router<AppState<S>> {
    Router::new()
        .route("/login/user", post(public::login_requester::<S>))
        .route("/login/pengelola", post(public::login_reviewer::<S>))
}

/// Routes that need a requester token; the caller adds the auth layer
pub fn requester_routes<S: Backend>(state: &AppState<S>) -> Router<AppState<S>> {
    uploads(state, "user")
        .merge(requests::requester_routes::<S>())
        .route("/permintaan/me", get(counts::count::<S>))
        .route("/change-password/user", put(account::change_password::<S>))
}

/// Routes that need a reviewer token; the caller adds the auth layer
pub fn reviewer_routes<S: Backend>(state: &AppState<S>) -> Router<AppState<S>> {
    uploads(state, "pengelola")
        .merge(requests::reviewer_routes::<S>())
        .route("/permintaan", get(counts::count::<S>))
        .route("/change-password/pengelola", put(account::change_password::<S>))
}

/// `/uploads/<scope>/{docs|img}` served straight from the attachment root
fn uploads<S: Backend>(state: &AppState<S>, scope: &str) -> Router<AppState<S>> {
    let store = state.requests.attachments();
    [AttachmentCategory::Document, AttachmentCategory::Image]
        .into_iter()
        .fold(Router::new(), |router, category| {
            router.nest_service(
                &format!("/uploads/{}/{}", scope, category.dir_name()),
                ServeDir::new(store.category_dir(category)),
            )
        })
}

//! The same eight endpoints for each of the six request kinds. The kind
//! descriptor reaches the handlers as a request extension.

pub mod requester;
pub mod reviewer;

use axum::routing::{get, post, put};
use axum::{Extension, Router};

use crate::database::Backend;
use crate::requests::KINDS;
use crate::AppState;

pub fn requester_routes<S: Backend>() -> Router<AppState<S>> {
    KINDS.iter().fold(Router::new(), |router, &kind| {
        let base = format!("/{}", kind.slug);
        let routes = Router::new()
            .route(&base, post(requester::create::<S>))
            .route(&format!("{}/me", base), get(requester::list_own::<S>))
            .route(&format!("{}/me/:id", base), get(requester::show_own::<S>))
            .route(
                &format!("{}/:id", base),
                put(requester::update::<S>).delete(requester::remove::<S>),
            )
            .layer(Extension(kind));
        router.merge(routes)
    })
}

pub fn reviewer_routes<S: Backend>() -> Router<AppState<S>> {
    KINDS.iter().fold(Router::new(), |router, &kind| {
        let base = format!("/{}", kind.slug);
        let routes = Router::new()
            .route(&base, get(reviewer::list_all::<S>))
            .route(
                &format!("{}/:id", base),
                get(reviewer::show::<S>).patch(reviewer::update_status::<S>),
            )
            .layer(Extension(kind));
        router.merge(routes)
    })
}

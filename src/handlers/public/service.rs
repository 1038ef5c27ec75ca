use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::Backend;
use crate::requests::KINDS;
use crate::AppState;

/// GET / - service info
pub async fn root() -> Json<Value> {
    let kinds: Vec<&str> = KINDS.iter().map(|kind| kind.slug).collect();

    Json(json!({
        "message": "Layanan Aptika API",
        "data": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "login": "/api/v1/login/{user|pengelola} (public)",
                "requests": "/api/v1/:kind[/me][/:id]",
                "counts": "/api/v1/permintaan[/me]",
                "uploads": "/api/v1/uploads/{user|pengelola}/{docs|img}/:filename",
            },
            "kinds": kinds,
        }
    }))
}

/// GET /health - store ping
pub async fn health<S: Backend>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "ok",
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "message": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::server::AppState;
use crate::server::dto::HealthResponse;

/// Unauthenticated health probe. Degrades (503) when the database stops
/// answering; credential lookups report plain UNAUTHORIZED in that state,
/// so this endpoint is the signal that the backend is down.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database_ok = state.store.ping().is_ok();

    let body = HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        database: if database_ok {
            "connected"
        } else {
            "disconnected"
        },
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body))
}

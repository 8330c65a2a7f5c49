use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get},
};
use tower_http::cors::CorsLayer;

use super::admin::admin_router;
use super::{files, health};
use crate::store::Store;
use crate::sync::events::Outbound;
use crate::sync::{RoomRegistry, sync_handler};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub rooms: RoomRegistry,
    /// Configured admin key; admin endpoints reject everything when unset.
    pub admin_api_key: Option<String>,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, admin_api_key: Option<String>) -> Self {
        Self {
            store,
            rooms: RoomRegistry::new(),
            admin_api_key,
            started_at: Instant::now(),
        }
    }

    /// Entire-room fanout for mutations arriving over the request path, so
    /// peers converge regardless of which transport a change came from.
    pub fn broadcast_all(&self, tenant_id: &str, event: &Outbound) {
        let delivered = self.rooms.broadcast(tenant_id, &event.to_frame(), None);
        tracing::debug!(tenant = %tenant_id, event = event.name(), delivered, "broadcast");
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request handled"
    );

    response
}

pub fn create_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/files",
            get(files::get_files)
                .post(files::create_file)
                .put(files::upsert_file)
                .patch(files::rename_file)
                .delete(files::delete_file),
        )
        .route("/files/all", delete(files::delete_all))
        .route("/sync", get(sync_handler))
        .nest("/admin", admin_router())
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}

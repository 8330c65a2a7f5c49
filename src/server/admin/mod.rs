mod keys;
mod tenants;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Tenant routes
        .route("/tenants", post(tenants::create_tenant))
        .route("/tenants", get(tenants::list_tenants))
        .route("/tenants/{id}", get(tenants::get_tenant))
        .route("/tenants/{id}", delete(tenants::delete_tenant))
        // Key routes
        .route("/tenants/{id}/keys", post(keys::create_key))
        .route("/tenants/{id}/keys", get(keys::list_keys))
        .route("/keys/{id}", delete(keys::revoke_key))
}

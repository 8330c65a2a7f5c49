use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::auth::key::{display_prefix, generate_key, hash_key};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateKeyRequest, CreateKeyResponse};
use crate::server::response::ApiError;
use crate::types::{ApiKey, Permission};

pub async fn create_key(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
    Json(req): Json<CreateKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(Error::Validation("key name cannot be empty".to_string()).into());
    }

    let permissions = if req.permissions.is_empty() {
        Permission::read_write()
    } else {
        let strs: Vec<&str> = req.permissions.iter().map(String::as_str).collect();
        Permission::parse_many(&strs).ok_or_else(|| {
            Error::Validation("permissions must be drawn from {read, write}".to_string())
        })?
    };

    let tenant = state.store.get_tenant(&tenant_id)?.ok_or(Error::NotFound)?;

    let plaintext = generate_key(&tenant.id);
    let key = ApiKey {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.id,
        name: req.name,
        key_prefix: display_prefix(&plaintext),
        key_hash: hash_key(&plaintext),
        permissions,
        created_at: Utc::now(),
        last_used_at: None,
        revoked_at: None,
    };
    state.store.create_api_key(&key)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateKeyResponse {
            key: plaintext,
            metadata: key,
        }),
    ))
}

pub async fn list_keys(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get_tenant(&tenant_id)?.is_none() {
        return Err(Error::NotFound.into());
    }
    let keys = state.store.list_tenant_api_keys(&tenant_id)?;
    Ok(Json(keys))
}

/// Revocation keeps the row (for audit and prefix display); only the
/// `revoked_at` timestamp disables it.
pub async fn revoke_key(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.revoke_api_key(&id)? && state.store.get_api_key(&id)?.is_none() {
        return Err(Error::NotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

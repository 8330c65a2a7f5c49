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
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::CreateTenantRequest;
use crate::server::response::ApiError;
use crate::types::Tenant;

const MAX_TENANT_NAME_LEN: usize = 100;

fn validate_tenant_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(Error::Validation("tenant name cannot be empty".to_string()).into());
    }
    if name.len() > MAX_TENANT_NAME_LEN {
        return Err(Error::Validation(format!(
            "tenant name cannot exceed {MAX_TENANT_NAME_LEN} characters"
        ))
        .into());
    }
    Ok(())
}

pub async fn create_tenant(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_tenant_name(&req.name)?;

    let tenant = Tenant {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        created_at: Utc::now(),
    };
    state.store.create_tenant(&tenant)?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

pub async fn list_tenants(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let tenants = state.store.list_tenants()?;
    Ok(Json(tenants))
}

pub async fn get_tenant(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = state.store.get_tenant(&id)?.ok_or(Error::NotFound)?;
    Ok(Json(tenant))
}

pub async fn delete_tenant(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.delete_tenant(&id)? {
        return Err(Error::NotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

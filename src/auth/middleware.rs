use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthIdentity, resolve_tenant_key, verify_admin_key};
use crate::error::Error;
use crate::server::AppState;
use crate::server::response::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor requiring a tenant key with read permission.
pub struct RequireRead(pub AuthIdentity);

/// Extractor requiring a tenant key with write permission.
pub struct RequireWrite(pub AuthIdentity);

/// Extractor requiring the configured admin key.
pub struct RequireAdmin;

fn header_key(parts: &Parts) -> Result<&str, Error> {
    parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::Unauthorized)
}

fn require_permission(
    parts: &Parts,
    state: &Arc<AppState>,
    write: bool,
) -> Result<AuthIdentity, ApiError> {
    let raw = header_key(parts)?;
    let identity = resolve_tenant_key(state, raw)?;
    let allowed = if write {
        identity.permissions.can_write()
    } else {
        identity.permissions.can_read()
    };
    if !allowed {
        let perm = if write { "write" } else { "read" };
        return Err(Error::Forbidden(format!("{perm} permission required")).into());
    }
    Ok(identity)
}

impl FromRequestParts<Arc<AppState>> for RequireRead {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require_permission(parts, state, false).map(RequireRead)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireWrite {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require_permission(parts, state, true).map(RequireWrite)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = header_key(parts)?;
        verify_admin_key(state, raw)?;
        Ok(RequireAdmin)
    }
}

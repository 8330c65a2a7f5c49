pub mod key;
mod middleware;

pub use middleware::{RequireAdmin, RequireRead, RequireWrite};

use crate::error::{Error, Result};
use crate::server::AppState;
use crate::types::Permission;

use key::KeyKind;

/// The identity bound to a request or channel connection at authentication.
/// Assigned once at handshake completion and carried through handler
/// invocations as an immutable value.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub tenant_id: String,
    pub permissions: Permission,
    pub key_id: String,
}

/// Resolves a plaintext tenant key to its identity.
///
/// Lookup is by exact SHA-256 hash equality, restricted to non-revoked keys,
/// so a revoked key is indistinguishable from an unknown one. Store
/// unavailability surfaces as `Unauthorized` rather than leaking backend
/// state; `/health` is the signal for that condition.
pub fn resolve_tenant_key(state: &AppState, raw: &str) -> Result<AuthIdentity> {
    match key::classify_key(raw)? {
        KeyKind::Admin => Err(Error::Forbidden(
            "admin keys cannot access store endpoints".to_string(),
        )),
        KeyKind::Tenant => {
            let hash = key::hash_key(raw);
            let record = state
                .store
                .get_api_key_by_hash(&hash)
                .map_err(|e| {
                    tracing::error!("credential lookup failed: {e}");
                    Error::Unauthorized
                })?
                .ok_or(Error::InvalidKey)?;

            // Best-effort; failures never fail the caller.
            let store = state.store.clone();
            let key_id = record.id.clone();
            tokio::spawn(async move {
                if let Err(e) = store.update_api_key_last_used(&key_id) {
                    tracing::warn!("failed to update key last_used_at: {e}");
                }
            });

            Ok(AuthIdentity {
                tenant_id: record.tenant_id,
                permissions: record.permissions,
                key_id: record.id,
            })
        }
    }
}

/// Validates a plaintext against the configured admin key with constant-time
/// equality. No database lookup is involved.
pub fn verify_admin_key(state: &AppState, raw: &str) -> Result<()> {
    match key::classify_key(raw)? {
        KeyKind::Tenant => Err(Error::Forbidden("admin access required".to_string())),
        KeyKind::Admin => {
            let configured = state.admin_api_key.as_deref().ok_or(Error::Unauthorized)?;
            if key::constant_time_eq(raw, configured) {
                Ok(())
            } else {
                Err(Error::InvalidKey)
            }
        }
    }
}

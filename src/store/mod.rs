mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::types::*;

/// Days between soft-delete and eligibility for permanent removal.
pub const TOMBSTONE_TTL_DAYS: i64 = 30;

/// Content hash over the stored representation: `"sha256:" + hex`.
///
/// Both peers hash the stored string (base64 for binary files), never raw
/// bytes, so binary reconciliation converges on identical hashes.
#[must_use]
pub fn content_hash(content: &str) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(content.as_bytes())))
}

/// Filters and pagination for file listings.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub path_prefix: Option<String>,
    pub path_contains: Option<String>,
    /// Normalized extension tokens (trimmed, lowercased).
    pub extensions: Option<Vec<String>>,
    /// Case-insensitive substring over content; implies non-binary.
    pub content_contains: Option<String>,
    pub is_binary: Option<bool>,
    pub include_deleted: bool,
    pub limit: i64,
    pub offset: i64,
}

impl ListOptions {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 1000;
}

/// One page of listing results plus the unpaginated total.
#[derive(Debug)]
pub struct FilePage {
    pub files: Vec<FileSummary>,
    pub total: i64,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Tenant operations
    fn create_tenant(&self, tenant: &Tenant) -> Result<()>;
    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>>;
    fn list_tenants(&self) -> Result<Vec<Tenant>>;
    fn delete_tenant(&self, id: &str) -> Result<bool>;

    // API key operations
    fn create_api_key(&self, key: &ApiKey) -> Result<()>;
    fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>>;
    /// Exact-hash lookup, restricted to non-revoked keys.
    fn get_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>>;
    fn list_tenant_api_keys(&self, tenant_id: &str) -> Result<Vec<ApiKey>>;
    /// Sets `revoked_at`; the row stays for audit.
    fn revoke_api_key(&self, id: &str) -> Result<bool>;
    fn update_api_key_last_used(&self, id: &str) -> Result<()>;

    // File operations, each scoped to a tenant
    /// Returns the active record; tombstones read as absent.
    fn get_file(&self, tenant_id: &str, path: &str) -> Result<Option<FileRecord>>;
    /// Returns the record regardless of tombstone state.
    fn get_file_any(&self, tenant_id: &str, path: &str) -> Result<Option<FileRecord>>;
    /// Idempotent discovery: returns the existing active record with
    /// `created=false`, or resurrects/inserts an empty record with `created=true`.
    fn create_empty(&self, tenant_id: &str, path: &str) -> Result<(FileRecord, bool)>;
    /// Fails with `Conflict` against an active record; resurrects a tombstone.
    fn create_strict(&self, tenant_id: &str, path: &str, content: &str) -> Result<FileRecord>;
    /// Updates an active record (`created=false`) or resurrects/inserts
    /// (`created=true`).
    fn upsert_file(&self, tenant_id: &str, path: &str, content: &str)
        -> Result<(FileRecord, bool)>;
    /// Atomic compare-and-act; missing and already-tombstoned targets both
    /// report `false` with no error.
    fn soft_delete(&self, tenant_id: &str, path: &str) -> Result<bool>;
    fn soft_delete_all(&self, tenant_id: &str) -> Result<u64>;
    /// Rename per the destination-eviction rules; `created=true` when there
    /// was no active source.
    fn rename_file(
        &self,
        tenant_id: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(FileRecord, bool)>;
    /// Permanently deletes tombstones past their TTL.
    fn cleanup_expired(&self) -> Result<u64>;
    fn list_files(&self, tenant_id: &str, options: &ListOptions) -> Result<FilePage>;

    /// Liveness probe for the health endpoint.
    fn ping(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_of_empty_string() {
        assert_eq!(
            content_hash(""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_content_hash_known_value() {
        // sha256("hello")
        assert_eq!(
            content_hash("hello"),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}

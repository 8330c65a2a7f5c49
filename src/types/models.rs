use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Permission;

/// A tenant namespace. Owns files and API keys; deletion cascades to both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An API key credential bound to one tenant.
///
/// Only the SHA-256 hash of the plaintext and a short display prefix are
/// persisted; the plaintext is returned exactly once at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// First 16 characters of the plaintext, for display.
    pub key_prefix: String,
    #[serde(skip)]
    pub key_hash: String,
    pub permissions: Permission,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// A stored file. `content` is the stored representation: UTF-8 text for
/// text files, base64 text for binary files. `hash` and `size` are computed
/// over that representation on every write.
///
/// A record with `expires_at` set is a tombstone: invisible to normal reads,
/// content cleared, eligible for permanent deletion once `expires_at` passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    #[serde(skip)]
    pub tenant_id: String,
    pub path: String,
    pub content: String,
    pub hash: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub is_binary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.expires_at.is_some()
    }
}

/// Listing projection: everything except `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    pub path: String,
    pub hash: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub is_binary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

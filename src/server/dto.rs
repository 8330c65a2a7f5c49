use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ApiKey, FileRecord, FileSummary};

/// Query parameters for `GET /files`. With `path` set and neither `limit`
/// nor `offset`, the request is a single-file read; otherwise it is a
/// listing and `path` acts as a path prefix filter.
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_deleted: Option<bool>,
    /// Comma-separated extension tokens.
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub content_contains: Option<String>,
    #[serde(default)]
    pub path_contains: Option<String>,
    #[serde(default)]
    pub is_binary: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteFileQuery {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WriteFileRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFileRequest {
    pub path: String,
    pub new_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub hash: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub is_binary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileResponse {
    /// Single-file reads include the stored content.
    #[must_use]
    pub fn with_content(record: &FileRecord) -> Self {
        Self {
            content: Some(record.content.clone()),
            ..Self::without_content(record)
        }
    }

    #[must_use]
    pub fn without_content(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            content: None,
            hash: record.hash.clone(),
            size: record.size,
            extension: record.extension.clone(),
            is_binary: record.is_binary,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    /// Subset of {"read", "write"}; both when omitted.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateKeyResponse {
    /// The plaintext key, returned exactly once.
    pub key: String,
    #[serde(flatten)]
    pub metadata: ApiKey,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since process start.
    pub uptime: u64,
    pub database: &'static str,
}

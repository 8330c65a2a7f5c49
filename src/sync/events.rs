//! Channel event names, payloads, and the ack envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Error;
use crate::types::FileRecord;

pub const CREATED_FILE: &str = "created-file";
pub const MODIFIED_FILE: &str = "modified-file";
pub const DELETED_FILE: &str = "deleted-file";
pub const RENAMED_FILE: &str = "renamed-file";

pub const FILE_CREATED: &str = "file-created";
pub const FILE_MODIFIED: &str = "file-modified";
pub const FILE_DELETED: &str = "file-deleted";
pub const FILE_RENAMED: &str = "file-renamed";

/// One client-originated frame: `{"id": n, "event": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub id: u64,
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct PathPayload {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct ModifyPayload {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePayload {
    pub old_path: String,
    pub new_path: String,
}

/// Acknowledgment envelope, sent exactly once per inbound event.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AckError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AckError {
    pub code: &'static str,
    pub message: String,
}

impl Ack {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            hash: None,
            error: None,
        }
    }

    #[must_use]
    pub fn ok_with_hash(hash: &str) -> Self {
        Self {
            success: true,
            hash: Some(hash.to_string()),
            error: None,
        }
    }

    /// Channel acks carry a restricted code set: auth failures become
    /// FORBIDDEN and everything unexpected becomes INTERNAL_ERROR.
    #[must_use]
    pub fn err(error: &Error) -> Self {
        let code = match error {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Forbidden(_) => "FORBIDDEN",
            _ => "INTERNAL_ERROR",
        };
        let message = match code {
            "INTERNAL_ERROR" => "internal error".to_string(),
            _ => error.to_string(),
        };
        Self {
            success: false,
            hash: None,
            error: Some(AckError { code, message }),
        }
    }

    /// Serializes the ack frame for a given correlation id.
    #[must_use]
    pub fn to_frame(&self, id: u64) -> String {
        json!({ "id": id, "ack": self }).to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreatedEvent {
    pub path: String,
    pub content: String,
    pub hash: String,
    pub size: i64,
    pub is_binary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileModifiedEvent {
    pub path: String,
    pub content: String,
    pub hash: String,
    pub size: i64,
    pub is_binary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDeletedEvent {
    pub path: String,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRenamedEvent {
    pub old_path: String,
    pub new_path: String,
    pub content: String,
    pub hash: String,
    pub size: i64,
    pub is_binary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A server-originated event. Broadcast payloads carry the full stored
/// content plus metadata so receiving peers can apply the change without a
/// follow-up read.
#[derive(Debug, Clone)]
pub enum Outbound {
    Created(FileCreatedEvent),
    Modified(FileModifiedEvent),
    Deleted(FileDeletedEvent),
    Renamed(FileRenamedEvent),
}

impl Outbound {
    #[must_use]
    pub fn created(record: &FileRecord) -> Self {
        Outbound::Created(FileCreatedEvent {
            path: record.path.clone(),
            content: record.content.clone(),
            hash: record.hash.clone(),
            size: record.size,
            is_binary: record.is_binary,
            extension: record.extension.clone(),
            created_at: record.created_at,
        })
    }

    #[must_use]
    pub fn modified(record: &FileRecord) -> Self {
        Outbound::Modified(FileModifiedEvent {
            path: record.path.clone(),
            content: record.content.clone(),
            hash: record.hash.clone(),
            size: record.size,
            is_binary: record.is_binary,
            extension: record.extension.clone(),
            updated_at: record.updated_at,
        })
    }

    #[must_use]
    pub fn deleted(path: &str, deleted_at: DateTime<Utc>) -> Self {
        Outbound::Deleted(FileDeletedEvent {
            path: path.to_string(),
            deleted_at,
        })
    }

    #[must_use]
    pub fn renamed(old_path: &str, record: &FileRecord) -> Self {
        Outbound::Renamed(FileRenamedEvent {
            old_path: old_path.to_string(),
            new_path: record.path.clone(),
            content: record.content.clone(),
            hash: record.hash.clone(),
            size: record.size,
            is_binary: record.is_binary,
            extension: record.extension.clone(),
            updated_at: record.updated_at,
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Outbound::Created(_) => FILE_CREATED,
            Outbound::Modified(_) => FILE_MODIFIED,
            Outbound::Deleted(_) => FILE_DELETED,
            Outbound::Renamed(_) => FILE_RENAMED,
        }
    }

    /// Serializes the broadcast frame: `{"event": "...", "data": {...}}`.
    #[must_use]
    pub fn to_frame(&self) -> String {
        let data = match self {
            Outbound::Created(e) => json!(e),
            Outbound::Modified(e) => json!(e),
            Outbound::Deleted(e) => json!(e),
            Outbound::Renamed(e) => json!(e),
        };
        json!({ "event": self.name(), "data": data }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_frames() {
        let frame = Ack::ok_with_hash("sha256:abc").to_frame(7);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["ack"]["success"], true);
        assert_eq!(value["ack"]["hash"], "sha256:abc");
        assert!(value["ack"].get("error").is_none());

        let frame = Ack::err(&Error::Forbidden("write permission required".into())).to_frame(3);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["ack"]["success"], false);
        assert_eq!(value["ack"]["error"]["code"], "FORBIDDEN");
    }

    #[test]
    fn test_ack_hides_internal_details() {
        let frame = Ack::err(&Error::Internal("connection pool exhausted".into())).to_frame(1);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["ack"]["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(value["ack"]["error"]["message"], "internal error");
    }

    #[test]
    fn test_outbound_frame_shape() {
        let record = FileRecord {
            id: "id-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            path: "a.md".to_string(),
            content: "hello".to_string(),
            hash: "sha256:abc".to_string(),
            size: 5,
            extension: Some("md".to_string()),
            is_binary: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at: None,
        };

        let frame = Outbound::created(&record).to_frame();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "file-created");
        assert_eq!(value["data"]["path"], "a.md");
        assert_eq!(value["data"]["content"], "hello");
        assert_eq!(value["data"]["isBinary"], false);
        assert_eq!(value["data"]["extension"], "md");
        assert!(value["data"].get("createdAt").is_some());

        let frame = Outbound::renamed("old.md", &record).to_frame();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "file-renamed");
        assert_eq!(value["data"]["oldPath"], "old.md");
        assert_eq!(value["data"]["newPath"], "a.md");
    }

    #[test]
    fn test_inbound_frame_parsing() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"id": 4, "event": "created-file", "data": {"path": "a.md"}}"#)
                .unwrap();
        assert_eq!(frame.id, 4);
        assert_eq!(frame.event, CREATED_FILE);

        let payload: PathPayload = serde_json::from_value(frame.data).unwrap();
        assert_eq!(payload.path, "a.md");

        assert!(serde_json::from_str::<InboundFrame>(r#"{"id": 4}"#).is_err());
    }
}

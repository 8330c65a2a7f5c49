//! Inbound channel event handling: validate, authorize, persist, decide the
//! ack and the broadcast. Transport-independent so the logic is testable
//! without a live socket.

use chrono::Utc;
use serde::de::DeserializeOwned;

use super::events::*;
use crate::auth::AuthIdentity;
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::validation::{validate_content, validate_path};

/// What one inbound event produced: the ack for the caller and, on state
/// change, the event to fan out to the rest of the room.
#[derive(Debug)]
pub struct EventOutcome {
    pub ack: Ack,
    pub broadcast: Option<Outbound>,
}

impl EventOutcome {
    fn ack_only(ack: Ack) -> Self {
        Self {
            ack,
            broadcast: None,
        }
    }
}

/// Runs one inbound event to completion. Errors never escape: they fold into
/// the ack envelope, and the connection stays open.
pub fn dispatch(state: &AppState, identity: &AuthIdentity, frame: &InboundFrame) -> EventOutcome {
    match run(state, identity, frame) {
        Ok(outcome) => outcome,
        Err(error) => {
            match &error {
                Error::Validation(_) | Error::Forbidden(_) => {
                    tracing::warn!(event = %frame.event, "event rejected: {error}");
                }
                _ => tracing::error!(event = %frame.event, "event failed: {error:?}"),
            }
            EventOutcome::ack_only(Ack::err(&error))
        }
    }
}

fn run(state: &AppState, identity: &AuthIdentity, frame: &InboundFrame) -> Result<EventOutcome> {
    match frame.event.as_str() {
        CREATED_FILE => {
            require_write(identity)?;
            let payload: PathPayload = parse(&frame.data)?;
            validate_path(&payload.path)?;

            let (record, created) = state.store.create_empty(&identity.tenant_id, &payload.path)?;
            Ok(EventOutcome {
                ack: Ack::ok_with_hash(&record.hash),
                broadcast: created.then(|| Outbound::created(&record)),
            })
        }
        MODIFIED_FILE => {
            require_write(identity)?;
            let payload: ModifyPayload = parse(&frame.data)?;
            validate_path(&payload.path)?;
            validate_content(&payload.content)?;

            let (record, created) =
                state
                    .store
                    .upsert_file(&identity.tenant_id, &payload.path, &payload.content)?;
            let broadcast = if created {
                Outbound::created(&record)
            } else {
                Outbound::modified(&record)
            };
            Ok(EventOutcome {
                ack: Ack::ok_with_hash(&record.hash),
                broadcast: Some(broadcast),
            })
        }
        DELETED_FILE => {
            require_write(identity)?;
            let payload: PathPayload = parse(&frame.data)?;
            validate_path(&payload.path)?;

            let deleted = state.store.soft_delete(&identity.tenant_id, &payload.path)?;
            Ok(EventOutcome {
                ack: Ack::ok(),
                broadcast: deleted.then(|| Outbound::deleted(&payload.path, Utc::now())),
            })
        }
        RENAMED_FILE => {
            require_write(identity)?;
            let payload: RenamePayload = parse(&frame.data)?;
            validate_path(&payload.old_path)?;
            validate_path(&payload.new_path)?;
            if payload.old_path == payload.new_path {
                return Err(Error::Validation(
                    "oldPath and newPath must differ".to_string(),
                ));
            }

            let (record, created) = state.store.rename_file(
                &identity.tenant_id,
                &payload.old_path,
                &payload.new_path,
            )?;
            let (ack, broadcast) = if created {
                (Ack::ok(), Outbound::created(&record))
            } else {
                (
                    Ack::ok_with_hash(&record.hash),
                    Outbound::renamed(&payload.old_path, &record),
                )
            };
            Ok(EventOutcome {
                ack,
                broadcast: Some(broadcast),
            })
        }
        other => Err(Error::Validation(format!("unknown event '{other}'"))),
    }
}

fn require_write(identity: &AuthIdentity) -> Result<()> {
    if identity.permissions.can_write() {
        Ok(())
    } else {
        Err(Error::Forbidden("write permission required".to_string()))
    }
}

fn parse<T: DeserializeOwned>(data: &serde_json::Value) -> Result<T> {
    serde_json::from_value(data.clone())
        .map_err(|e| Error::Validation(format!("invalid payload: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::store::{SqliteStore, Store, content_hash};
    use crate::types::{Permission, Tenant};

    fn test_state() -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
            .create_tenant(&Tenant {
                id: "tenant-1".to_string(),
                name: "Test".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        (temp, AppState::new(Arc::new(store), None))
    }

    fn writer() -> AuthIdentity {
        AuthIdentity {
            tenant_id: "tenant-1".to_string(),
            permissions: Permission::read_write(),
            key_id: "key-1".to_string(),
        }
    }

    fn reader() -> AuthIdentity {
        AuthIdentity {
            tenant_id: "tenant-1".to_string(),
            permissions: Permission::read_only(),
            key_id: "key-2".to_string(),
        }
    }

    fn frame(event: &str, data: serde_json::Value) -> InboundFrame {
        InboundFrame {
            id: 1,
            event: event.to_string(),
            data,
        }
    }

    #[test]
    fn test_created_file_acks_empty_hash_and_broadcasts_once() {
        let (_temp, state) = test_state();
        let identity = writer();

        let outcome = dispatch(
            &state,
            &identity,
            &frame(CREATED_FILE, json!({"path": "notes/a.md"})),
        );
        assert!(outcome.ack.success);
        assert_eq!(outcome.ack.hash.as_deref(), Some(content_hash("").as_str()));
        assert!(matches!(outcome.broadcast, Some(Outbound::Created(_))));

        // Idempotent discovery: same ack, no broadcast
        let outcome = dispatch(
            &state,
            &identity,
            &frame(CREATED_FILE, json!({"path": "notes/a.md"})),
        );
        assert!(outcome.ack.success);
        assert_eq!(outcome.ack.hash.as_deref(), Some(content_hash("").as_str()));
        assert!(outcome.broadcast.is_none());
    }

    #[test]
    fn test_modified_file_broadcasts_created_then_modified() {
        let (_temp, state) = test_state();
        let identity = writer();

        let outcome = dispatch(
            &state,
            &identity,
            &frame(MODIFIED_FILE, json!({"path": "x.md", "content": "v1"})),
        );
        assert_eq!(outcome.ack.hash.as_deref(), Some(content_hash("v1").as_str()));
        assert!(matches!(outcome.broadcast, Some(Outbound::Created(_))));

        let outcome = dispatch(
            &state,
            &identity,
            &frame(MODIFIED_FILE, json!({"path": "x.md", "content": "v2"})),
        );
        assert_eq!(outcome.ack.hash.as_deref(), Some(content_hash("v2").as_str()));
        assert!(matches!(outcome.broadcast, Some(Outbound::Modified(_))));
    }

    #[test]
    fn test_modified_file_over_tombstone_broadcasts_created() {
        let (_temp, state) = test_state();
        let identity = writer();

        dispatch(
            &state,
            &identity,
            &frame(MODIFIED_FILE, json!({"path": "x.md", "content": "v1"})),
        );
        dispatch(&state, &identity, &frame(DELETED_FILE, json!({"path": "x.md"})));

        let outcome = dispatch(
            &state,
            &identity,
            &frame(MODIFIED_FILE, json!({"path": "x.md", "content": "again"})),
        );
        assert!(matches!(outcome.broadcast, Some(Outbound::Created(_))));
    }

    #[test]
    fn test_deleted_file_on_missing_path_succeeds_silently() {
        let (_temp, state) = test_state();
        let identity = writer();

        let outcome = dispatch(
            &state,
            &identity,
            &frame(DELETED_FILE, json!({"path": "ghost.md"})),
        );
        assert!(outcome.ack.success);
        assert!(outcome.ack.hash.is_none());
        assert!(outcome.broadcast.is_none());
    }

    #[test]
    fn test_deleted_file_broadcasts_once() {
        let (_temp, state) = test_state();
        let identity = writer();

        dispatch(
            &state,
            &identity,
            &frame(MODIFIED_FILE, json!({"path": "x.md", "content": "v"})),
        );

        let outcome = dispatch(&state, &identity, &frame(DELETED_FILE, json!({"path": "x.md"})));
        assert!(matches!(outcome.broadcast, Some(Outbound::Deleted(_))));

        let outcome = dispatch(&state, &identity, &frame(DELETED_FILE, json!({"path": "x.md"})));
        assert!(outcome.ack.success);
        assert!(outcome.broadcast.is_none());
    }

    #[test]
    fn test_renamed_file_with_source_broadcasts_renamed() {
        let (_temp, state) = test_state();
        let identity = writer();

        dispatch(
            &state,
            &identity,
            &frame(MODIFIED_FILE, json!({"path": "a.md", "content": "A"})),
        );

        let outcome = dispatch(
            &state,
            &identity,
            &frame(RENAMED_FILE, json!({"oldPath": "a.md", "newPath": "b.md"})),
        );
        assert!(outcome.ack.success);
        assert_eq!(outcome.ack.hash.as_deref(), Some(content_hash("A").as_str()));
        match outcome.broadcast {
            Some(Outbound::Renamed(event)) => {
                assert_eq!(event.old_path, "a.md");
                assert_eq!(event.new_path, "b.md");
                assert_eq!(event.content, "A");
            }
            other => panic!("expected file-renamed, got {other:?}"),
        }
    }

    #[test]
    fn test_renamed_file_without_source_broadcasts_created() {
        let (_temp, state) = test_state();
        let identity = writer();

        let outcome = dispatch(
            &state,
            &identity,
            &frame(RENAMED_FILE, json!({"oldPath": "ghost.md", "newPath": "b.md"})),
        );
        assert!(outcome.ack.success);
        assert!(outcome.ack.hash.is_none());
        assert!(matches!(outcome.broadcast, Some(Outbound::Created(_))));
    }

    #[test]
    fn test_rename_to_same_path_is_rejected() {
        let (_temp, state) = test_state();

        let outcome = dispatch(
            &state,
            &writer(),
            &frame(RENAMED_FILE, json!({"oldPath": "a.md", "newPath": "a.md"})),
        );
        assert!(!outcome.ack.success);
        assert_eq!(outcome.ack.error.unwrap().code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_read_only_connection_is_forbidden() {
        let (_temp, state) = test_state();

        let outcome = dispatch(
            &state,
            &reader(),
            &frame(CREATED_FILE, json!({"path": "a.md"})),
        );
        assert!(!outcome.ack.success);
        assert_eq!(outcome.ack.error.unwrap().code, "FORBIDDEN");
        assert!(outcome.broadcast.is_none());
    }

    #[test]
    fn test_invalid_path_is_rejected() {
        let (_temp, state) = test_state();

        let outcome = dispatch(
            &state,
            &writer(),
            &frame(CREATED_FILE, json!({"path": "a<b.md"})),
        );
        assert_eq!(outcome.ack.error.unwrap().code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let (_temp, state) = test_state();

        let outcome = dispatch(
            &state,
            &writer(),
            &frame(MODIFIED_FILE, json!({"path": "a.md"})),
        );
        assert_eq!(outcome.ack.error.unwrap().code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let (_temp, state) = test_state();

        let outcome = dispatch(&state, &writer(), &frame("rebooted-file", json!({})));
        assert_eq!(outcome.ack.error.unwrap().code, "VALIDATION_ERROR");
    }
}

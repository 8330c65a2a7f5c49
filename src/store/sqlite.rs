use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql, params, params_from_iter};
use uuid::Uuid;

use super::schema::SCHEMA;
use super::{FilePage, ListOptions, Store, TOMBSTONE_TTL_DAYS, content_hash};
use crate::error::{Error, Result};
use crate::types::*;
use crate::validation::classify_path;

/// SQLite-backed store. One connection behind a mutex; every operation runs
/// under an exclusive lease, so detect-then-act sequences on a `(tenant,
/// path)` pair are serialized.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Exclusive lease on the connection. Public so embedding applications
    /// and tests can run SQL the trait does not cover.
    pub fn lease(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Timestamps are persisted as RFC 3339 text; columns filled by the schema's
/// `datetime('now')` defaults carry SQLite's space-separated form instead.
fn parse_datetime(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    tracing::error!(value = raw, "unparseable timestamp in store, substituting now");
    Utc::now()
}

fn encode_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const FILE_COLUMNS: &str =
    "id, tenant_id, path, content, hash, size, extension, is_binary, created_at, updated_at, expires_at";

const SUMMARY_COLUMNS: &str =
    "id, path, hash, size, extension, is_binary, created_at, updated_at, expires_at";

fn map_file_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        path: row.get(2)?,
        content: row.get(3)?,
        hash: row.get(4)?,
        size: row.get(5)?,
        extension: row.get(6)?,
        is_binary: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
        expires_at: row.get::<_, Option<String>>(10)?.map(|s| parse_datetime(&s)),
    })
}

fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileSummary> {
    Ok(FileSummary {
        id: row.get(0)?,
        path: row.get(1)?,
        hash: row.get(2)?,
        size: row.get(3)?,
        extension: row.get(4)?,
        is_binary: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
        expires_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
    })
}

fn map_key_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        key_prefix: row.get(3)?,
        key_hash: row.get(4)?,
        permissions: Permission::from_bits(row.get::<_, i64>(5)?),
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
        revoked_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
    })
}

const KEY_COLUMNS: &str =
    "id, tenant_id, name, key_prefix, key_hash, permissions, created_at, last_used_at, revoked_at";

fn get_file_any_tx(conn: &Connection, tenant_id: &str, path: &str) -> Result<Option<FileRecord>> {
    conn.query_row(
        &format!("SELECT {FILE_COLUMNS} FROM files WHERE tenant_id = ?1 AND path = ?2"),
        params![tenant_id, path],
        map_file_row,
    )
    .optional()
    .map_err(Error::from)
}

fn get_file_active_tx(
    conn: &Connection,
    tenant_id: &str,
    path: &str,
) -> Result<Option<FileRecord>> {
    conn.query_row(
        &format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE tenant_id = ?1 AND path = ?2 AND expires_at IS NULL"
        ),
        params![tenant_id, path],
        map_file_row,
    )
    .optional()
    .map_err(Error::from)
}

fn insert_file_tx(
    conn: &Connection,
    tenant_id: &str,
    path: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<FileRecord> {
    let (extension, is_binary) = classify_path(path);
    let record = FileRecord {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        path: path.to_string(),
        content: content.to_string(),
        hash: content_hash(content),
        size: content.len() as i64,
        extension,
        is_binary,
        created_at: now,
        updated_at: now,
        expires_at: None,
    };

    conn.execute(
        "INSERT INTO files (id, tenant_id, path, content, hash, size, extension, is_binary, created_at, updated_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
        params![
            record.id,
            record.tenant_id,
            record.path,
            record.content,
            record.hash,
            record.size,
            record.extension,
            record.is_binary,
            encode_datetime(&record.created_at),
            encode_datetime(&record.updated_at),
        ],
    )?;

    Ok(record)
}

/// Reuses a tombstoned row in place: same id, `expires_at` cleared, content
/// fields rewritten, derived metadata recomputed from the path.
fn resurrect_file_tx(
    conn: &Connection,
    existing: &FileRecord,
    content: &str,
    now: DateTime<Utc>,
) -> Result<FileRecord> {
    let (extension, is_binary) = classify_path(&existing.path);
    let record = FileRecord {
        content: content.to_string(),
        hash: content_hash(content),
        size: content.len() as i64,
        extension,
        is_binary,
        updated_at: now,
        expires_at: None,
        ..existing.clone()
    };

    conn.execute(
        "UPDATE files SET content = ?1, hash = ?2, size = ?3, extension = ?4, is_binary = ?5,
                          updated_at = ?6, expires_at = NULL
         WHERE id = ?7",
        params![
            record.content,
            record.hash,
            record.size,
            record.extension,
            record.is_binary,
            encode_datetime(&record.updated_at),
            record.id,
        ],
    )?;

    Ok(record)
}

/// Tombstones the active row at `(tenant, path)` if one exists. Returns
/// whether exactly one row was affected.
fn soft_delete_tx(
    conn: &Connection,
    tenant_id: &str,
    path: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let expires = now + Duration::days(TOMBSTONE_TTL_DAYS);
    let rows = conn.execute(
        "UPDATE files SET content = '', hash = ?1, size = 0, expires_at = ?2, updated_at = ?3
         WHERE tenant_id = ?4 AND path = ?5 AND expires_at IS NULL",
        params![
            content_hash(""),
            encode_datetime(&expires),
            encode_datetime(&now),
            tenant_id,
            path,
        ],
    )?;
    Ok(rows == 1)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.lease().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Tenant operations

    fn create_tenant(&self, tenant: &Tenant) -> Result<()> {
        self.lease().execute(
            "INSERT INTO tenants (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![tenant.id, tenant.name, encode_datetime(&tenant.created_at)],
        )?;
        Ok(())
    }

    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>> {
        let conn = self.lease();
        conn.query_row(
            "SELECT id, name, created_at FROM tenants WHERE id = ?1",
            params![id],
            |row| {
                Ok(Tenant {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tenants(&self) -> Result<Vec<Tenant>> {
        let conn = self.lease();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM tenants ORDER BY created_at")?;

        let rows = stmt.query_map([], |row| {
            Ok(Tenant {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_tenant(&self, id: &str) -> Result<bool> {
        let rows = self
            .lease()
            .execute("DELETE FROM tenants WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // API key operations

    fn create_api_key(&self, key: &ApiKey) -> Result<()> {
        self.lease().execute(
            "INSERT INTO api_keys (id, tenant_id, name, key_prefix, key_hash, permissions, created_at, last_used_at, revoked_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                key.id,
                key.tenant_id,
                key.name,
                key.key_prefix,
                key.key_hash,
                key.permissions.to_bits(),
                encode_datetime(&key.created_at),
                key.last_used_at.as_ref().map(encode_datetime),
                key.revoked_at.as_ref().map(encode_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>> {
        let conn = self.lease();
        conn.query_row(
            &format!("SELECT {KEY_COLUMNS} FROM api_keys WHERE id = ?1"),
            params![id],
            map_key_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        let conn = self.lease();
        conn.query_row(
            &format!(
                "SELECT {KEY_COLUMNS} FROM api_keys
                 WHERE key_hash = ?1 AND revoked_at IS NULL"
            ),
            params![key_hash],
            map_key_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tenant_api_keys(&self, tenant_id: &str) -> Result<Vec<ApiKey>> {
        let conn = self.lease();
        let mut stmt = conn.prepare(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE tenant_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![tenant_id], map_key_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn revoke_api_key(&self, id: &str) -> Result<bool> {
        let rows = self.lease().execute(
            "UPDATE api_keys SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL",
            params![encode_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    fn update_api_key_last_used(&self, id: &str) -> Result<()> {
        self.lease().execute(
            "UPDATE api_keys SET last_used_at = ?1 WHERE id = ?2",
            params![encode_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // File operations

    fn get_file(&self, tenant_id: &str, path: &str) -> Result<Option<FileRecord>> {
        get_file_active_tx(&self.lease(), tenant_id, path)
    }

    fn get_file_any(&self, tenant_id: &str, path: &str) -> Result<Option<FileRecord>> {
        get_file_any_tx(&self.lease(), tenant_id, path)
    }

    fn create_empty(&self, tenant_id: &str, path: &str) -> Result<(FileRecord, bool)> {
        let mut conn = self.lease();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let result = match get_file_any_tx(&tx, tenant_id, path)? {
            Some(record) if !record.is_tombstone() => (record, false),
            Some(tombstone) => (resurrect_file_tx(&tx, &tombstone, "", now)?, true),
            None => (insert_file_tx(&tx, tenant_id, path, "", now)?, true),
        };

        tx.commit()?;
        Ok(result)
    }

    fn create_strict(&self, tenant_id: &str, path: &str, content: &str) -> Result<FileRecord> {
        let mut conn = self.lease();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let record = match get_file_any_tx(&tx, tenant_id, path)? {
            Some(record) if !record.is_tombstone() => {
                return Err(Error::Conflict(format!("file already exists at '{path}'")));
            }
            Some(tombstone) => resurrect_file_tx(&tx, &tombstone, content, now)?,
            None => insert_file_tx(&tx, tenant_id, path, content, now)?,
        };

        tx.commit()?;
        Ok(record)
    }

    fn upsert_file(
        &self,
        tenant_id: &str,
        path: &str,
        content: &str,
    ) -> Result<(FileRecord, bool)> {
        let mut conn = self.lease();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let result = match get_file_any_tx(&tx, tenant_id, path)? {
            Some(record) if !record.is_tombstone() => {
                let (extension, is_binary) = classify_path(path);
                let updated = FileRecord {
                    content: content.to_string(),
                    hash: content_hash(content),
                    size: content.len() as i64,
                    extension,
                    is_binary,
                    updated_at: now,
                    ..record
                };
                tx.execute(
                    "UPDATE files SET content = ?1, hash = ?2, size = ?3, extension = ?4,
                                      is_binary = ?5, updated_at = ?6
                     WHERE id = ?7",
                    params![
                        updated.content,
                        updated.hash,
                        updated.size,
                        updated.extension,
                        updated.is_binary,
                        encode_datetime(&updated.updated_at),
                        updated.id,
                    ],
                )?;
                (updated, false)
            }
            Some(tombstone) => (resurrect_file_tx(&tx, &tombstone, content, now)?, true),
            None => (insert_file_tx(&tx, tenant_id, path, content, now)?, true),
        };

        tx.commit()?;
        Ok(result)
    }

    fn soft_delete(&self, tenant_id: &str, path: &str) -> Result<bool> {
        soft_delete_tx(&self.lease(), tenant_id, path, Utc::now())
    }

    fn soft_delete_all(&self, tenant_id: &str) -> Result<u64> {
        let now = Utc::now();
        let expires = now + Duration::days(TOMBSTONE_TTL_DAYS);
        let rows = self.lease().execute(
            "UPDATE files SET content = '', hash = ?1, size = 0, expires_at = ?2, updated_at = ?3
             WHERE tenant_id = ?4 AND expires_at IS NULL",
            params![
                content_hash(""),
                encode_datetime(&expires),
                encode_datetime(&now),
                tenant_id,
            ],
        )?;
        Ok(rows as u64)
    }

    fn rename_file(
        &self,
        tenant_id: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(FileRecord, bool)> {
        let mut conn = self.lease();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let source = get_file_active_tx(&tx, tenant_id, old_path)?;

        let result = match source {
            None => {
                // No active source: evict the destination and leave an empty
                // record there, reusing a tombstoned row when present.
                soft_delete_tx(&tx, tenant_id, new_path, now)?;
                let record = match get_file_any_tx(&tx, tenant_id, new_path)? {
                    Some(tombstone) => resurrect_file_tx(&tx, &tombstone, "", now)?,
                    None => insert_file_tx(&tx, tenant_id, new_path, "", now)?,
                };
                (record, true)
            }
            Some(src) => {
                // Evict any active destination, then hard-delete whatever
                // tombstone holds the destination path: the unique key spans
                // active rows and tombstones, so the renamed row would collide.
                soft_delete_tx(&tx, tenant_id, new_path, now)?;
                tx.execute(
                    "DELETE FROM files WHERE tenant_id = ?1 AND path = ?2 AND expires_at IS NOT NULL",
                    params![tenant_id, new_path],
                )?;

                let (extension, is_binary) = classify_path(new_path);
                tx.execute(
                    "UPDATE files SET path = ?1, extension = ?2, is_binary = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![
                        new_path,
                        extension,
                        is_binary,
                        encode_datetime(&now),
                        src.id,
                    ],
                )?;

                let record = FileRecord {
                    path: new_path.to_string(),
                    extension,
                    is_binary,
                    updated_at: now,
                    ..src
                };
                (record, false)
            }
        };

        tx.commit()?;
        Ok(result)
    }

    fn cleanup_expired(&self) -> Result<u64> {
        let rows = self.lease().execute(
            "DELETE FROM files WHERE expires_at IS NOT NULL AND expires_at < ?1",
            params![encode_datetime(&Utc::now())],
        )?;
        Ok(rows as u64)
    }

    fn list_files(&self, tenant_id: &str, options: &ListOptions) -> Result<FilePage> {
        let mut where_sql = String::from("tenant_id = ?");
        let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(tenant_id.to_string())];

        if !options.include_deleted {
            where_sql.push_str(" AND expires_at IS NULL");
        }
        // instr() matches case-sensitively and treats %/_ literally.
        if let Some(prefix) = &options.path_prefix {
            where_sql.push_str(" AND instr(path, ?) = 1");
            args.push(Box::new(prefix.clone()));
        }
        if let Some(needle) = &options.path_contains {
            where_sql.push_str(" AND instr(path, ?) > 0");
            args.push(Box::new(needle.clone()));
        }
        if let Some(extensions) = &options.extensions {
            if !extensions.is_empty() {
                let placeholders = vec!["?"; extensions.len()].join(", ");
                where_sql.push_str(&format!(" AND extension IN ({placeholders})"));
                for ext in extensions {
                    args.push(Box::new(ext.clone()));
                }
            }
        }
        if let Some(needle) = &options.content_contains {
            // Content search is text-only; binary rows hold base64.
            where_sql.push_str(" AND is_binary = 0 AND instr(lower(content), lower(?)) > 0");
            args.push(Box::new(needle.clone()));
        }
        if let Some(is_binary) = options.is_binary {
            where_sql.push_str(" AND is_binary = ?");
            args.push(Box::new(is_binary));
        }

        let conn = self.lease();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM files WHERE {where_sql}"),
            params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM files WHERE {where_sql}
             ORDER BY path LIMIT ? OFFSET ?"
        ))?;
        args.push(Box::new(options.limit));
        args.push(Box::new(options.offset));

        let rows = stmt.query_map(
            params_from_iter(args.iter().map(|a| a.as_ref())),
            map_summary_row,
        )?;
        let files = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(FilePage { files, total })
    }

    fn ping(&self) -> Result<()> {
        let conn = self.lease();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

pub const SCHEMA: &str = r#"
-- Tenants provide isolation; deletion cascades to keys and files
CREATE TABLE IF NOT EXISTS tenants (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- API keys are auth credentials; only the hash and a display prefix persist
CREATE TABLE IF NOT EXISTS api_keys (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    key_prefix TEXT NOT NULL,       -- first 16 chars of the plaintext
    key_hash TEXT NOT NULL,         -- sha256 hex of the plaintext
    permissions INTEGER NOT NULL DEFAULT 0,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    last_used_at TEXT,
    revoked_at TEXT                 -- non-NULL means disabled
);

-- File records; a row with expires_at set is a tombstone
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    path TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',  -- stored representation (text or base64)
    hash TEXT NOT NULL,                -- "sha256:" + hex over content
    size INTEGER NOT NULL DEFAULT 0,   -- byte length of content
    extension TEXT,                    -- derived from path, never client-supplied
    is_binary INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- tombstone TTL; row reusable until then

    -- One row per (tenant, path) across active rows and tombstones
    UNIQUE(tenant_id, path)
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_api_keys_hash ON api_keys(key_hash);
CREATE INDEX IF NOT EXISTS idx_api_keys_tenant ON api_keys(tenant_id);
CREATE INDEX IF NOT EXISTS idx_files_tenant ON files(tenant_id);
CREATE INDEX IF NOT EXISTS idx_files_expires ON files(expires_at);
CREATE INDEX IF NOT EXISTS idx_files_tenant_extension ON files(tenant_id, extension);
"#;

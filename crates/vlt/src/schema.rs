//! Opening the vault database
//!
//! Tables are created idempotently on open. Foreign keys are a
//! per-connection setting in SQLite and are switched on here, so labels
//! can't reference missing secrets and go away with their secret.

use crate::error::StoreError;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS master_key (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        key TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS secrets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL DEFAULT '',
        secret TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        secret_id INTEGER NOT NULL REFERENCES secrets(id) ON DELETE CASCADE,
        UNIQUE (name, secret_id)
    );

    CREATE INDEX IF NOT EXISTS idx_labels_secret ON labels(secret_id);
    CREATE INDEX IF NOT EXISTS idx_secrets_name ON secrets(name);
"#;

/// Open or create the vault at `path`
pub fn open(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    init(&conn)?;

    tracing::debug!(path = %path.display(), "opened vault");
    Ok(conn)
}

/// In-memory vault, mostly for tests
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    init(&conn)?;
    Ok(conn)
}

/// Enable foreign keys and create missing tables
pub fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

//! SQLite connection handling and schema.
//!
//! One place owns the DDL so every service sees the same tables. The
//! `mappings` table enforces the one-mapping-per-placeholder invariant with
//! a UNIQUE constraint; violating it inside a save rolls the whole
//! transaction back.

use std::path::Path;

use rusqlite::Connection;

use crate::error::PersistenceError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS templates (
    id                TEXT PRIMARY KEY,
    company_id        TEXT NOT NULL DEFAULT '',
    field_id          TEXT NOT NULL DEFAULT '',
    option_id         TEXT NOT NULL DEFAULT '',
    source            BLOB,
    source_md5        TEXT NOT NULL DEFAULT '',
    page_count        INTEGER NOT NULL DEFAULT 1,
    status            TEXT NOT NULL DEFAULT 'pending',
    placeholder_count INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS mappings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id TEXT NOT NULL,
    placeholder TEXT NOT NULL,
    field_id    INTEGER NOT NULL,
    field_label TEXT,
    field_kind  TEXT,
    is_required INTEGER NOT NULL DEFAULT 0,
    page        INTEGER NOT NULL DEFAULT 0,
    x_pct       REAL,
    y_pct       REAL,
    width_pct   REAL,
    height_pct  REAL,
    UNIQUE (template_id, placeholder, page)
);
CREATE TABLE IF NOT EXISTS mapping_history (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    context_id  TEXT NOT NULL,
    placeholder TEXT NOT NULL DEFAULT '',
    field_id    INTEGER NOT NULL,
    confidence  REAL NOT NULL,
    verified    INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_mappings_template ON mappings (template_id);
CREATE INDEX IF NOT EXISTS idx_history_context ON mapping_history (context_id);
";

/// Opens (creating if necessary) the database at `path` and applies the
/// schema.
pub fn open(path: impl AsRef<Path>) -> Result<Connection, PersistenceError> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// In-memory database with the same schema, used by tests.
pub fn open_in_memory() -> Result<Connection, PersistenceError> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

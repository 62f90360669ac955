//! Database Connection and Setup
//!
//! Opens the SQLite file backing the document store and runs migrations.

use std::path::Path;

use rusqlite::Connection;

use crate::domain::{DomainError, DomainResult};

pub fn open(path: &Path) -> DomainResult<Connection> {
    let conn = Connection::open(path)
        .map_err(|e| DomainError::StoreUnavailable(format!("open {}: {}", path.display(), e)))?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> DomainResult<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| DomainError::StoreUnavailable(format!("open :memory:: {}", e)))?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Run database migrations. Idempotent; safe to call on every open.
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS items (
            id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            updated_at_ms INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            doc TEXT NOT NULL,
            PRIMARY KEY (id, owner_id)
        )",
        (),
    )
    .map_err(|e| DomainError::StoreUnavailable(format!("migrate items: {}", e)))?;

    // Serves the changed-since watermark query
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_owner_updated ON items(owner_id, updated_at_ms)",
        (),
    )
    .map_err(|e| DomainError::StoreUnavailable(format!("migrate index: {}", e)))?;

    Ok(())
}

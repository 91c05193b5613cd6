//! Schema bootstrap for the `memories` table.
//!
//! # Responsibility
//! - Create the table on every open when it is absent.
//! - Mirror the schema version to `PRAGMA user_version`.
//!
//! # Invariants
//! - Bootstrap is idempotent and safe on databases written by earlier releases
//!   (`user_version = 0` with the table already present).
//! - A database stamped with a newer version is refused, never modified.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// Schema version written by this binary.
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_MEMORIES_SQL: &str = "CREATE TABLE IF NOT EXISTS memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    task TEXT NOT NULL,
    project TEXT DEFAULT '' NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL
);";

/// Ensures the `memories` table exists on `conn`.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    if current_version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: SCHEMA_VERSION,
        });
    }

    let tx = conn.transaction().map_err(DbError::Schema)?;
    tx.execute_batch(CREATE_MEMORIES_SQL)
        .map_err(DbError::Schema)?;
    if current_version < SCHEMA_VERSION {
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))
            .map_err(DbError::Schema)?;
    }
    tx.commit().map_err(DbError::Schema)?;

    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
        .map_err(DbError::Schema)
}

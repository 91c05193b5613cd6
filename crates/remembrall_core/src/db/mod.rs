//! SQLite storage bootstrap and schema entry points.
//!
//! # Responsibility
//! - Open and configure the single-file SQLite connection.
//! - Ensure the `memories` table exists before any data access.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write memories before the schema bootstrap succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Connection could not be established.
    Open(rusqlite::Error),
    /// Pragmas or table creation failed.
    Schema(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "database connection failed: {err}"),
            Self::Schema(err) => write!(f, "schema setup failed: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) | Self::Schema(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

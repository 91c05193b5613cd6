//! Memory repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/select/delete primitives over the `memories` table.
//! - Provide the always-rolled-back dry-run wrapper.
//!
//! # Invariants
//! - User text is only ever passed as bound parameters.
//! - Ordering is `created_at DESC, id DESC`; the `id` tie-break keeps
//!   "most recent" deterministic within one timestamp second.
//! - SQLite builds without `SQLITE_ENABLE_UPDATE_DELETE_LIMIT` cannot bound a
//!   `DELETE` by `ORDER BY ... LIMIT`, so single-row deletes go through an id.

use crate::model::memory::{validate_project, validate_task, Memory, MemoryId, ValidationError};
use log::{debug, error, info};
use rusqlite::{params, params_from_iter, Connection, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;

const MEMORY_COLUMNS: &str = "id, task, project, created_at";
const RECENT_FIRST: &str = "ORDER BY created_at DESC, id DESC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for memory operations. SQLite variants carry the engine message.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    /// Statement preparation failed.
    Prepare(rusqlite::Error),
    /// Statement step/execution failed.
    Execute(rusqlite::Error),
    /// Transaction begin or rollback failed.
    Transaction(rusqlite::Error),
    NotFound(MemoryId),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Prepare(err) => write!(f, "failed to prepare statement: {err}"),
            Self::Execute(err) => write!(f, "failed to execute statement: {err}"),
            Self::Transaction(err) => write!(f, "transaction failed: {err}"),
            Self::NotFound(id) => write!(f, "memory not found: {id}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Prepare(err) | Self::Execute(err) | Self::Transaction(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for memory storage.
///
/// `project` arguments filter on exact equality; `None` means every row.
pub trait MemoryRepository {
    /// Inserts one memory; an absent project is stored as `''`.
    fn insert(&self, task: &str, project: Option<&str>) -> RepoResult<MemoryId>;
    /// Returns the most recent matching memory, or `None` when nothing matches.
    fn select_latest(&self, project: Option<&str>) -> RepoResult<Option<Memory>>;
    /// Streams matching memories most recent first until `visit` breaks.
    ///
    /// Returns how many rows were handed to `visit`.
    fn select_all(
        &self,
        project: Option<&str>,
        visit: &mut dyn FnMut(Memory) -> ControlFlow<()>,
    ) -> RepoResult<usize>;
    /// Deletes one memory by id and returns it.
    fn delete_by_id(&self, id: MemoryId) -> RepoResult<Memory>;
    /// Deletes every matching memory and returns them most recent first.
    fn delete_all(&self, project: Option<&str>) -> RepoResult<Vec<Memory>>;
    /// Counts matching memories.
    fn count(&self, project: Option<&str>) -> RepoResult<u64>;
    /// Runs `body` inside a transaction that is always rolled back.
    ///
    /// # Errors
    /// - `RepoError::Transaction` if the transaction cannot begin (`body` is not run).
    /// - `RepoError::Transaction` if the rollback fails after `body` ran.
    fn with_dry_run<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed memory repository bound to one open connection.
pub struct SqliteMemoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_each<P: Params>(
        &self,
        sql: &str,
        params: P,
        visit: &mut dyn FnMut(Memory) -> ControlFlow<()>,
    ) -> RepoResult<usize> {
        let mut stmt = self.conn.prepare(sql).map_err(RepoError::Prepare)?;
        let mut rows = stmt.query(params).map_err(RepoError::Execute)?;
        let mut visited = 0;

        while let Some(row) = rows.next().map_err(RepoError::Execute)? {
            visited += 1;
            let memory = parse_memory_row(row).map_err(RepoError::Execute)?;
            if visit(memory).is_break() {
                break;
            }
        }

        Ok(visited)
    }

    fn query_collect<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Memory>> {
        let mut memories = Vec::new();
        self.query_each(sql, params, &mut |memory| {
            memories.push(memory);
            ControlFlow::Continue(())
        })?;
        Ok(memories)
    }
}

impl MemoryRepository for SqliteMemoryRepository<'_> {
    fn insert(&self, task: &str, project: Option<&str>) -> RepoResult<MemoryId> {
        validate_task(task)?;
        validate_project(project)?;

        let mut stmt = self
            .conn
            .prepare("INSERT INTO memories (task, project) VALUES (?1, ?2);")
            .map_err(RepoError::Prepare)?;
        stmt.execute(params![task, project.unwrap_or("")])
            .map_err(RepoError::Execute)?;

        let id = self.conn.last_insert_rowid();
        info!("event=memory_insert module=repo status=ok id={id}");
        Ok(id)
    }

    fn select_latest(&self, project: Option<&str>) -> RepoResult<Option<Memory>> {
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memories{} {RECENT_FIRST} LIMIT 1;",
            project_clause(project)
        );
        let mut latest = None;
        self.query_each(&sql, params_from_iter(project), &mut |memory| {
            latest = Some(memory);
            ControlFlow::Break(())
        })?;

        debug!(
            "event=memory_select_latest module=repo status=ok filtered={} found={}",
            project.is_some(),
            latest.is_some()
        );
        Ok(latest)
    }

    fn select_all(
        &self,
        project: Option<&str>,
        visit: &mut dyn FnMut(Memory) -> ControlFlow<()>,
    ) -> RepoResult<usize> {
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memories{} {RECENT_FIRST};",
            project_clause(project)
        );
        let visited = self.query_each(&sql, params_from_iter(project), visit)?;

        debug!(
            "event=memory_select_all module=repo status=ok filtered={} visited={visited}",
            project.is_some()
        );
        Ok(visited)
    }

    fn delete_by_id(&self, id: MemoryId) -> RepoResult<Memory> {
        let sql = format!("DELETE FROM memories WHERE id = ?1 RETURNING {MEMORY_COLUMNS};");
        let deleted = self.query_collect(&sql, params![id])?;

        match deleted.into_iter().next() {
            Some(memory) => {
                info!("event=memory_delete module=repo status=ok mode=by_id id={id}");
                Ok(memory)
            }
            None => Err(RepoError::NotFound(id)),
        }
    }

    fn delete_all(&self, project: Option<&str>) -> RepoResult<Vec<Memory>> {
        let sql = format!(
            "DELETE FROM memories{} RETURNING {MEMORY_COLUMNS};",
            project_clause(project)
        );
        let mut deleted = self.query_collect(&sql, params_from_iter(project))?;
        // RETURNING row order is unspecified.
        deleted.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        info!(
            "event=memory_delete module=repo status=ok mode=all filtered={} deleted={}",
            project.is_some(),
            deleted.len()
        );
        Ok(deleted)
    }

    fn count(&self, project: Option<&str>) -> RepoResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM memories{};",
            project_clause(project)
        );
        let mut stmt = self.conn.prepare(&sql).map_err(RepoError::Prepare)?;
        let count = stmt
            .query_row(params_from_iter(project), |row| row.get::<_, i64>(0))
            .map_err(RepoError::Execute)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn with_dry_run<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = self.conn.unchecked_transaction().map_err(|err| {
            error!("event=dry_run module=repo status=error stage=begin error={err}");
            RepoError::Transaction(err)
        })?;
        debug!("event=dry_run module=repo status=begin");

        let result = body();

        if let Err(err) = tx.rollback() {
            error!("event=dry_run module=repo status=error stage=rollback error={err}");
            return Err(RepoError::Transaction(err).into());
        }
        debug!(
            "event=dry_run module=repo status=rolled_back body_ok={}",
            result.is_ok()
        );

        result
    }
}

fn project_clause(project: Option<&str>) -> &'static str {
    if project.is_some() {
        " WHERE project = ?1"
    } else {
        ""
    }
}

fn parse_memory_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    Ok(Memory {
        id: row.get("id")?,
        task: row.get("task")?,
        project: row.get("project")?,
        created_at: row.get("created_at")?,
    })
}

//! Memory domain model.
//!
//! # Responsibility
//! - Define the persisted note record shared by store and executor.
//! - Own field length limits enforced before any write reaches storage.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - An absent project is the empty string, never `NULL`.
//! - `created_at` is set once at insertion and never rewritten.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned row identifier.
pub type MemoryId = i64;

/// Maximum byte length accepted for `task` and `project`.
pub const MAX_FIELD_BYTES: usize = 256;

/// One remembered note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub id: MemoryId,
    pub task: String,
    /// Empty string when the memory is untagged.
    pub project: String,
    /// SQLite `CURRENT_TIMESTAMP` text, `YYYY-MM-DD HH:MM:SS` in UTC.
    pub created_at: String,
}

impl Memory {
    /// Returns whether this memory carries a project tag.
    pub fn has_project(&self) -> bool {
        !self.project.is_empty()
    }

    /// Returns the date-only prefix of `created_at` (`YYYY-MM-DD`).
    pub fn created_date(&self) -> &str {
        self.created_at.get(..10).unwrap_or(&self.created_at)
    }
}

/// Input problems detected before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `field` exceeds [`MAX_FIELD_BYTES`].
    FieldTooLong { field: &'static str, value: String },
    /// `add` was requested without a task description.
    MissingTask,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldTooLong { field, value } => write!(
                f,
                "{field} \"{value}\" exceeds char limit of {MAX_FIELD_BYTES} bytes"
            ),
            Self::MissingTask => write!(f, "running \"add\" command but missing task description"),
        }
    }
}

impl Error for ValidationError {}

/// Checks the task text length.
pub fn validate_task(task: &str) -> Result<(), ValidationError> {
    validate_field("task", task)
}

/// Checks the project tag length when one is present.
pub fn validate_project(project: Option<&str>) -> Result<(), ValidationError> {
    match project {
        Some(value) => validate_field("project", value),
        None => Ok(()),
    }
}

fn validate_field(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_FIELD_BYTES {
        return Err(ValidationError::FieldTooLong {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

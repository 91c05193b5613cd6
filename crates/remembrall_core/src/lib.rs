//! Core logic for remembrall, a command-line memory jotter.
//! This crate owns argument parsing, the SQLite memory store and command execution.

pub mod args;
pub mod config;
pub mod console;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use args::{parse_args, ParseError, ParseOutcome, USAGE};
pub use config::{AppConfig, ConfigError};
pub use console::Console;
pub use logging::{default_log_level, init_logging, LoggingError};
pub use model::command::{Command, CommandFunction, Verbosity};
pub use model::memory::{Memory, MemoryId, ValidationError, MAX_FIELD_BYTES};
pub use repo::memory_repo::{MemoryRepository, RepoError, RepoResult, SqliteMemoryRepository};
pub use service::command_service::{CommandError, CommandService, Outcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Version line printed by `--version`.
pub fn version_line() -> String {
    format!("remembrall v{}", core_version())
}

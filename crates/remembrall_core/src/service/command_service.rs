//! Command execution use-case service.
//!
//! # Responsibility
//! - Run one parsed `Command` (add/peek/clear) against a `MemoryRepository`.
//! - Report results through the console.
//!
//! # Invariants
//! - Field limits are checked before any storage call.
//! - Add creates exactly one row; non-`--all` clear removes exactly one row.
//! - Under `--dry-run` every mutation runs inside `with_dry_run` and is undone.
//! - Verbosity changes output only, never which statements run.

use crate::console::Console;
use crate::model::command::{Command, CommandFunction, Verbosity};
use crate::model::memory::{
    validate_project, validate_task, Memory, MemoryId, ValidationError,
};
use crate::repo::memory_repo::{MemoryRepository, RepoError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::time::Instant;

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added {
        id: MemoryId,
        task: String,
        dry_run: bool,
    },
    Peeked {
        count: usize,
    },
    Cleared {
        /// Most recent first.
        forgotten: Vec<Memory>,
        dry_run: bool,
    },
}

/// Fatal command failure.
#[derive(Debug)]
pub enum CommandError {
    Validation(ValidationError),
    Repo(RepoError),
    /// Non-`--all` clear found no matching memory.
    NothingToForget { project: Option<String> },
    Io(io::Error),
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::NothingToForget { project: Some(project) } => {
                write!(f, "no memory to forget in project \"{project}\"")
            }
            Self::NothingToForget { project: None } => write!(f, "no memory to forget"),
            Self::Io(err) => write!(f, "failed to write output: {err}"),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NothingToForget { .. } => None,
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ValidationError> for CommandError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CommandError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<io::Error> for CommandError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Executes parsed commands against a repository.
pub struct CommandService<R: MemoryRepository> {
    repo: R,
}

impl<R: MemoryRepository> CommandService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Executes `command` and writes its report to `console`.
    ///
    /// # Errors
    /// - `CommandError::Validation` for a missing task or over-long field; storage untouched.
    /// - `CommandError::Repo` for any SQLite failure.
    /// - `CommandError::NothingToForget` when a single-row clear matches nothing.
    pub fn execute<O: Write, E: Write>(
        &self,
        command: &Command,
        console: &mut Console<O, E>,
    ) -> Result<Outcome, CommandError> {
        let started_at = Instant::now();
        info!(
            "event=command_execute module=service status=start function={} all={} dry_run={}",
            command.function, command.all, command.dry_run
        );

        let result = match command.function {
            CommandFunction::Add => self.add(command, console),
            CommandFunction::Peek => self.peek(command, console),
            CommandFunction::Clear => self.clear(command, console),
        };

        match &result {
            Ok(_) => info!(
                "event=command_execute module=service status=ok function={} duration_ms={}",
                command.function,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=command_execute module=service status=error function={} duration_ms={} error_code={}",
                command.function,
                started_at.elapsed().as_millis(),
                error_code(err)
            ),
        }

        result
    }

    fn add<O: Write, E: Write>(
        &self,
        command: &Command,
        console: &mut Console<O, E>,
    ) -> Result<Outcome, CommandError> {
        let task = command.task.as_deref().ok_or(ValidationError::MissingTask)?;
        validate_task(task)?;
        validate_project(command.project())?;

        if !command.dry_run {
            return self.remember(task, command, console);
        }

        if !command.verbosity.is_silent() {
            console.info("Performing dry run. Memory will NOT be remembered!")?;
        }
        self.rolled_back(command.verbosity, console, |console| {
            self.remember(task, command, console)
        })
    }

    /// Runs `body` under `with_dry_run`, echoing the transaction boundaries in Verbose mode.
    fn rolled_back<O: Write, E: Write, F>(
        &self,
        verbosity: Verbosity,
        console: &mut Console<O, E>,
        body: F,
    ) -> Result<Outcome, CommandError>
    where
        F: FnOnce(&mut Console<O, E>) -> Result<Outcome, CommandError>,
    {
        if verbosity.is_verbose() {
            console.info("Begin transaction...")?;
        }
        let result = self.repo.with_dry_run(|| body(&mut *console));
        let rolled_back = !matches!(result, Err(CommandError::Repo(RepoError::Transaction(_))));
        if rolled_back && verbosity.is_verbose() {
            console.info("Rollback transaction...")?;
        }
        result
    }

    fn remember<O: Write, E: Write>(
        &self,
        task: &str,
        command: &Command,
        console: &mut Console<O, E>,
    ) -> Result<Outcome, CommandError> {
        if command.verbosity.is_verbose() {
            console.info(&format!(
                "Query: insert memory {}",
                describe_tag(command.project())
            ))?;
        }

        let id = self.repo.insert(task, command.project())?;
        // The row is stored at this point; a lost confirmation does not fail the add.
        if let Err(err) = console.info(&format!("\"{task}\" was added to your memory!")) {
            warn!(
                "event=memory_add module=service status=degraded id={id} stage=confirm error_kind={:?}",
                err.kind()
            );
        }

        Ok(Outcome::Added {
            id,
            task: task.to_string(),
            dry_run: command.dry_run,
        })
    }

    fn peek<O: Write, E: Write>(
        &self,
        command: &Command,
        console: &mut Console<O, E>,
    ) -> Result<Outcome, CommandError> {
        let project = command.project();
        validate_project(project)?;

        let verbosity = command.verbosity;
        if verbosity.is_verbose() {
            let scope = if command.all { "all memories" } else { "latest memory" };
            console.info(&format!(
                "Query: select {scope} {}",
                describe_filter(project)
            ))?;
            report_matches(self.repo.count(project)?, console)?;
        }
        if !verbosity.is_silent() {
            console.info("Currently Remembering:")?;
        }

        let count = if command.all {
            let mut write_result = Ok(());
            let visited = self.repo.select_all(project, &mut |memory| {
                match console.memory(&memory, verbosity.is_verbose()) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(err) => {
                        write_result = Err(err);
                        ControlFlow::Break(())
                    }
                }
            })?;
            write_result?;
            visited
        } else {
            match self.repo.select_latest(project)? {
                Some(memory) => {
                    console.memory(&memory, verbosity.is_verbose())?;
                    1
                }
                None => 0,
            }
        };

        Ok(Outcome::Peeked { count })
    }

    fn clear<O: Write, E: Write>(
        &self,
        command: &Command,
        console: &mut Console<O, E>,
    ) -> Result<Outcome, CommandError> {
        validate_project(command.project())?;

        if !command.dry_run {
            return self.forget(command, console);
        }

        if !command.verbosity.is_silent() {
            console.info("Performing dry run. Memory will NOT be forgotten!")?;
        }
        self.rolled_back(command.verbosity, console, |console| {
            self.forget(command, console)
        })
    }

    fn forget<O: Write, E: Write>(
        &self,
        command: &Command,
        console: &mut Console<O, E>,
    ) -> Result<Outcome, CommandError> {
        let project = command.project();
        let verbosity = command.verbosity;
        if verbosity.is_verbose() {
            let scope = if command.all { "all memories" } else { "latest memory" };
            console.info(&format!(
                "Query: delete {scope} {}",
                describe_filter(project)
            ))?;
            report_matches(self.repo.count(project)?, console)?;
        }

        let forgotten = if command.all {
            self.repo.delete_all(project)?
        } else {
            let latest = self.repo.select_latest(project)?.ok_or_else(|| {
                CommandError::NothingToForget {
                    project: project.map(str::to_string),
                }
            })?;
            if verbosity.is_verbose() {
                console.info("Found Memory:")?;
                console.memory(&latest, true)?;
            }
            vec![self.repo.delete_by_id(latest.id)?]
        };

        report_forgotten(&forgotten, verbosity, console)?;

        Ok(Outcome::Cleared {
            forgotten,
            dry_run: command.dry_run,
        })
    }
}

fn report_forgotten<O: Write, E: Write>(
    forgotten: &[Memory],
    verbosity: Verbosity,
    console: &mut Console<O, E>,
) -> io::Result<()> {
    if !verbosity.is_silent() {
        console.info("Forgotten Memories:")?;
    }
    for memory in forgotten {
        console.memory(memory, verbosity.is_verbose())?;
    }
    Ok(())
}

fn report_matches<O: Write, E: Write>(count: u64, console: &mut Console<O, E>) -> io::Result<()> {
    let noun = if count == 1 { "memory" } else { "memories" };
    console.info(&format!("{count} matching {noun}"))
}

fn describe_filter(project: Option<&str>) -> String {
    match project {
        Some(project) => format!("where project = \"{project}\""),
        None => "across all projects".to_string(),
    }
}

fn describe_tag(project: Option<&str>) -> String {
    match project {
        Some(project) if !project.is_empty() => format!("tagged \"{project}\""),
        _ => "without project".to_string(),
    }
}

fn error_code(err: &CommandError) -> &'static str {
    match err {
        CommandError::Validation(_) => "validation_failed",
        CommandError::Repo(RepoError::NotFound(_)) => "not_found",
        CommandError::Repo(RepoError::Transaction(_)) => "transaction_failed",
        CommandError::Repo(_) => "store_failed",
        CommandError::NothingToForget { .. } => "nothing_to_forget",
        CommandError::Io(_) => "io_failed",
    }
}

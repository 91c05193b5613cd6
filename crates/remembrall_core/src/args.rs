//! Command-line token parsing.
//!
//! # Responsibility
//! - Turn raw argument tokens into a `Command` or a `ParseError`.
//! - Collect unrecognized tokens instead of failing on them.
//!
//! # Invariants
//! - Flags are matched before the bare-token task fallback.
//! - The task slot is filled at most once.
//! - A missing project value is fatal; any other unknown token is not.

use crate::model::command::{Command, CommandFunction, Verbosity};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Usage text printed for `--help` and alongside parse errors.
pub const USAGE: &str = "\
Usage: rmbrl (COMMAND) [FLAGS]

Commands:
  add     Add memory to your collection (supports --project)
  peek    Show what you're currently remembering (supports --all, --project)
  clear   Forget memories (supports --all, --project)

Command Flags:
  -p, --project    Tag and filter memories by project name
                   (supported by: add, peek, clear)
  -a, --all        Apply operation to all memories
                   (supported by: peek, clear)

Global Flags:
  -h, --help       Show help information
  -V, --version    Show version information
  -v, --verbose    Enable verbose output
  -s, --silent     Enable silent mode
  -n, --dry-run    Perform dry run without making changes
";

/// Successful parse result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Help,
    Version,
    Run(Command),
}

/// Fatal argument errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// First token is not a known command; `None` when no tokens were given.
    UnknownCommand(Option<String>),
    /// `-p`/`--project` given without a following value.
    MissingProjectValue(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(Some(token)) => write!(f, "unknown command '{token}'"),
            Self::UnknownCommand(None) => write!(f, "missing command"),
            Self::MissingProjectValue(flag) => {
                write!(f, "project flag `{flag}` provided but missing project name")
            }
        }
    }
}

impl Error for ParseError {}

/// Parses tokens that follow the program name.
///
/// # Errors
/// - `ParseError::UnknownCommand` for an empty list or unknown first token.
/// - `ParseError::MissingProjectValue` when the split project form has no value.
pub fn parse_args<S: AsRef<str>>(tokens: &[S]) -> Result<ParseOutcome, ParseError> {
    let Some(first) = tokens.first().map(AsRef::<str>::as_ref) else {
        return Err(ParseError::UnknownCommand(None));
    };

    match first {
        "--help" | "-h" => return Ok(ParseOutcome::Help),
        "--version" | "-V" => return Ok(ParseOutcome::Version),
        _ => {}
    }

    let function = CommandFunction::from_token(first)
        .ok_or_else(|| ParseError::UnknownCommand(Some(first.to_string())))?;
    let mut command = Command::new(function);

    let mut index = 1;
    while index < tokens.len() {
        let token: &str = tokens[index].as_ref();
        index += 1;

        if matches!(token, "--all" | "-a") && function != CommandFunction::Add {
            command.all = true;
            continue;
        }
        if matches!(token, "--dry-run" | "-n") {
            command.dry_run = true;
            continue;
        }
        if matches!(token, "--verbose" | "-v") {
            command.verbosity = Verbosity::Verbose;
            continue;
        }
        if matches!(token, "--silent" | "-s") {
            command.verbosity = Verbosity::Silent;
            continue;
        }
        if let Some(project) = inline_project_value(token) {
            command.project = Some(project.to_string());
            continue;
        }
        if matches!(token, "--project" | "-p") {
            match tokens.get(index).map(AsRef::<str>::as_ref) {
                Some(value) if !value.starts_with('-') => {
                    command.project = Some(value.to_string());
                    index += 1;
                    continue;
                }
                _ => return Err(ParseError::MissingProjectValue(token.to_string())),
            }
        }
        if function == CommandFunction::Add && command.task.is_none() && !token.starts_with('-') {
            command.task = Some(token.to_string());
            continue;
        }

        command.ignored_flags.push(token.to_string());
    }

    Ok(ParseOutcome::Run(command))
}

fn inline_project_value(token: &str) -> Option<&str> {
    let (flag, value) = token.split_once('=')?;
    matches!(flag, "--project" | "-p").then_some(value)
}

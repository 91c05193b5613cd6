//! Parsed command model.
//!
//! # Responsibility
//! - Describe one invocation's intent after argument parsing.
//!
//! # Invariants
//! - A `Command` is immutable once parsing completes.
//! - `all` is never set for `CommandFunction::Add`.

use crate::model::memory::ValidationError;
use std::fmt::{Display, Formatter};

/// The operation selected by the first positional token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFunction {
    Add,
    Peek,
    Clear,
}

impl CommandFunction {
    /// Resolves a command literal (`add`, `peek`, `clear`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "add" => Some(Self::Add),
            "peek" => Some(Self::Peek),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Peek => "peek",
            Self::Clear => "clear",
        }
    }
}

impl Display for CommandFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Console verbosity. Affects presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    Silent,
    Verbose,
}

impl Verbosity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Silent => "silent",
            Self::Verbose => "verbose",
        }
    }

    pub fn is_silent(self) -> bool {
        self == Self::Silent
    }

    pub fn is_verbose(self) -> bool {
        self == Self::Verbose
    }
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured intent for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub function: CommandFunction,
    pub verbosity: Verbosity,
    /// Tag for `add`, filter for `peek`/`clear`. `Some("")` selects untagged rows.
    pub project: Option<String>,
    /// Only meaningful for `add`.
    pub task: Option<String>,
    pub all: bool,
    pub dry_run: bool,
    /// Tokens that matched no flag, in original order.
    pub ignored_flags: Vec<String>,
}

impl Command {
    /// Creates a command with default flags for `function`.
    pub fn new(function: CommandFunction) -> Self {
        Self {
            function,
            verbosity: Verbosity::default(),
            project: None,
            task: None,
            all: false,
            dry_run: false,
            ignored_flags: Vec::new(),
        }
    }

    /// Checks preconditions the parser leaves to the caller.
    ///
    /// # Errors
    /// - `ValidationError::MissingTask` when `add` has no task.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.function == CommandFunction::Add && self.task.is_none() {
            return Err(ValidationError::MissingTask);
        }
        Ok(())
    }

    /// Returns the single warning line for ignored tokens, if any should be shown.
    pub fn ignored_flags_warning(&self) -> Option<String> {
        if self.ignored_flags.is_empty() || self.verbosity.is_silent() {
            return None;
        }
        Some(format!("Ignoring flags: {}", self.ignored_flags.join(", ")))
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }
}

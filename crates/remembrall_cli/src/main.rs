//! `rmbrl` command-line entry point.
//!
//! # Responsibility
//! - Wire argument parsing, configuration, logging, storage and execution.
//! - Map every outcome to an exit code: `0` on success, `1` on any failure.
//!
//! # Invariants
//! - The database connection is scoped to `execute` and dropped on every path.
//! - Each fatal error produces exactly one `[ERROR]` line.

use log::{error, info};
use remembrall_core::db::{open_db, DbError};
use remembrall_core::{
    init_logging, parse_args, version_line, AppConfig, Command, CommandError, CommandService,
    ConfigError, Console, ParseError, ParseOutcome, SqliteMemoryRepository, ValidationError,
    USAGE,
};
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut console = Console::stdio();
    let code = run(&args, &mut console);
    let _ = console.flush();
    code
}

#[derive(Debug)]
enum RunError {
    Parse(ParseError),
    Validation(ValidationError),
    Config(ConfigError),
    Db(DbError),
    Command(CommandError),
    Io(io::Error),
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Command(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "failed to write output: {err}"),
        }
    }
}

impl From<ParseError> for RunError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<ValidationError> for RunError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConfigError> for RunError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for RunError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<CommandError> for RunError {
    fn from(value: CommandError) -> Self {
        Self::Command(value)
    }
}

impl From<io::Error> for RunError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

fn run<O: Write, E: Write>(args: &[String], console: &mut Console<O, E>) -> ExitCode {
    match try_run(args, console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            let _ = console.error(&err.to_string());
            if matches!(err, RunError::Parse(_)) {
                let _ = console.plain(USAGE);
            }
            ExitCode::FAILURE
        }
    }
}

fn try_run<O: Write, E: Write>(args: &[String], console: &mut Console<O, E>) -> Result<(), RunError> {
    let command = match parse_args(args)? {
        ParseOutcome::Help => return Ok(console.plain(USAGE)?),
        ParseOutcome::Version => return Ok(console.plain(&format!("{}\n", version_line()))?),
        ParseOutcome::Run(command) => command,
    };

    if let Some(warning) = command.ignored_flags_warning() {
        console.warn(&warning)?;
    }
    let verbose = command.verbosity.is_verbose();
    if verbose {
        print_command(&command, console)?;
    }

    command.validate()?;

    let config = AppConfig::from_env()?;
    config.ensure_data_dir()?;
    if let Err(message) = init_logging(config.log_level, &config.log_dir) {
        if verbose {
            console.warn(&format!("file logging disabled: {message}"))?;
        }
    }
    info!(
        "event=cli_run module=cli status=start function={}",
        command.function
    );

    if verbose {
        console.info(&format!("DB Path: {}", config.db_path.display()))?;
    }
    execute(&command, &config, console)
}

fn execute<O: Write, E: Write>(
    command: &Command,
    config: &AppConfig,
    console: &mut Console<O, E>,
) -> Result<(), RunError> {
    let conn = open_db(&config.db_path)?;
    if command.verbosity.is_verbose() {
        console.info("Database connection successful!")?;
        console.info("Table \"memories\" exists or created successfully!")?;
    }

    let service = CommandService::new(SqliteMemoryRepository::new(&conn));
    service.execute(command, console)?;
    Ok(())
}

fn print_command<O: Write, E: Write>(command: &Command, console: &mut Console<O, E>) -> io::Result<()> {
    console.info("Parsed Command Line Args:")?;
    console.info(&format!("    function: {}", command.function))?;
    console.info(&format!(
        "    task: {}",
        command.task.as_deref().unwrap_or("(none)")
    ))?;
    console.info(&format!(
        "    project: {}",
        command.project().unwrap_or("(none)")
    ))?;
    console.info(&format!("    all: {}", command.all))?;
    console.info(&format!("    dry-run: {}", command.dry_run))?;
    console.info(&format!("    verbosity: {}", command.verbosity))
}

//! Diagnostic file logging for one `rmbrl` invocation.
//!
//! # Responsibility
//! - Start a size-rotated log file under the data directory.
//! - Route panics through the log before the default hook runs.
//!
//! # Invariants
//! - The logger starts at most once per process; later calls are no-ops.
//! - Memory text never reaches the log files; events carry ids and counts only.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "rmbrl";
const ROTATE_AT_BYTES: u64 = 1024 * 1024;
const KEEP_LOG_FILES: usize = 3;
const PANIC_SUMMARY_CHARS: usize = 160;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    RelativeDir(PathBuf),
    CreateDir { path: PathBuf, source: std::io::Error },
    Start(FlexiLoggerError),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(message) => write!(f, "{message}"),
            Self::RelativeDir(path) => {
                write!(f, "log directory must be absolute, got `{}`", path.display())
            }
            Self::CreateDir { path, source } => {
                write!(f, "failed to create log directory `{}`: {source}", path.display())
            }
            Self::Start(err) => write!(f, "failed to start logger: {err}"),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Start(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts file logging at `level` under `log_dir`.
///
/// Returns `Ok(())` without side effects when a logger is already running.
///
/// # Errors
/// - `LoggingError::InvalidLevel` for a level outside trace|debug|info|warn|error.
/// - `LoggingError::RelativeDir` when `log_dir` is not absolute.
/// - `LoggingError::CreateDir` / `LoggingError::Start` when the log file cannot be opened.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), LoggingError> {
    let level = normalize_level(level).map_err(LoggingError::InvalidLevel)?;
    if !log_dir.is_absolute() {
        return Err(LoggingError::RelativeDir(log_dir.to_path_buf()));
    }

    LOGGER.get_or_try_init(|| -> Result<LoggerHandle, LoggingError> {
        std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
            path: log_dir.to_path_buf(),
            source,
        })?;

        let handle = Logger::try_with_str(level)
            .map_err(LoggingError::Start)?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir)
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(ROTATE_AT_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEEP_LOG_FILES),
            )
            .write_mode(WriteMode::Direct)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(LoggingError::Start)?;

        log_panics();
        info!(
            "event=app_start module=core status=ok platform={} version={} level={level}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        );
        Ok(handle)
    })?;

    Ok(())
}

/// Level used when `RMBRL_LOG` is unset: `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Maps a user-supplied level name onto the supported set.
pub fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn log_panics() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Payloads may quote a task; only a flattened prefix is logged.
        let location = panic_info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={location} payload={}",
            one_line(&payload, PANIC_SUMMARY_CHARS)
        );
        default_hook(panic_info);
    }));
}

/// Flattens `value` to a single line of at most `max_chars` characters.
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

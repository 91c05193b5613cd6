//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Locate the per-user data directory, database file and log directory.
//! - Resolve the file log level.
//!
//! # Invariants
//! - `RMBRL_DATA_DIR` overrides the platform default when set and non-empty.
//! - Only `ensure_data_dir` touches the file system.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "RMBRL_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "RMBRL_LOG";

const APP_DIR_NAME: &str = "rmbrl";
const DB_FILE_NAME: &str = "rmbrl.db";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    /// No override was given and the platform has no per-user data directory.
    NoDataDir,
    InvalidLogLevel(String),
    CreateDir { path: PathBuf, source: std::io::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDataDir => write!(
                f,
                "cannot locate a per-user data directory; set {DATA_DIR_ENV}"
            ),
            Self::InvalidLogLevel(message) => write!(f, "{LOG_LEVEL_ENV}: {message}"),
            Self::CreateDir { path, source } => {
                write!(f, "failed to create path `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Resolved paths and log level for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: &'static str,
}

impl AppConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var_os(key), platform_data_dir)
    }

    /// Resolves configuration through `lookup`, which maps a variable name to its value.
    /// `default_data_dir` is consulted only when `RMBRL_DATA_DIR` is unset or empty.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<OsString>,
        default_data_dir: impl FnOnce() -> Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let data_dir = match lookup(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        let log_level = match lookup(LOG_LEVEL_ENV) {
            Some(level) => normalize_level(&level.to_string_lossy())
                .map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        Ok(Self {
            db_path: data_dir.join(DB_FILE_NAME),
            log_dir: data_dir.join(LOG_DIR_NAME),
            data_dir,
            log_level,
        })
    }

    /// Creates the data directory when missing.
    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        create_dir(&self.data_dir)
    }
}

fn create_dir(path: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-user data directory: `%APPDATA%\\rmbrl`, `~/Library/Application Support/rmbrl`,
/// or `$XDG_DATA_HOME/rmbrl` (falling back to `~/.local/share/rmbrl`).
fn platform_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::{platform_data_dir, AppConfig, ConfigError, DATA_DIR_ENV, LOG_LEVEL_ENV};
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn resolve_with(
        vars: &[(&str, &str)],
        default_data_dir: Option<&str>,
    ) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), OsString::from(value)))
            .collect();
        AppConfig::resolve(|key| vars.get(key).cloned(), || {
            default_data_dir.map(PathBuf::from)
        })
    }

    #[test]
    fn data_dir_override_wins() {
        let config = resolve_with(
            &[(DATA_DIR_ENV, "/tmp/rmbrl-test"), (LOG_LEVEL_ENV, "WARN")],
            Some("/ignored/rmbrl"),
        )
        .expect("override should resolve");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/rmbrl-test"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/rmbrl-test/rmbrl.db"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/rmbrl-test/logs"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let err = resolve_with(&[(DATA_DIR_ENV, "/tmp/x"), (LOG_LEVEL_ENV, "loud")], None)
            .expect_err("unknown level must fail");
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
    }

    #[test]
    fn empty_override_falls_back_to_platform_dir() {
        let config = resolve_with(&[(DATA_DIR_ENV, "")], Some("/xdg/rmbrl"))
            .expect("platform dir should resolve");
        assert_eq!(config.db_path, PathBuf::from("/xdg/rmbrl/rmbrl.db"));
    }

    #[test]
    fn missing_platform_dir_is_reported() {
        let err = resolve_with(&[], None).expect_err("no data dir must fail");
        assert!(matches!(err, ConfigError::NoDataDir));
        assert!(err.to_string().contains(DATA_DIR_ENV));
    }

    #[test]
    fn platform_dir_ends_with_app_name() {
        if let Some(dir) = platform_data_dir() {
            assert!(dir.ends_with("rmbrl"));
        }
    }
}

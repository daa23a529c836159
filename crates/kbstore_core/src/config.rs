//! Store configuration.
//!
//! # Responsibility
//! - Describe how a store is opened (database path, replica source id).
//! - Carry calendar conventions (week start) and logging preferences.
//!
//! # Invariants
//! - Precedence, highest first: environment (`KBSTORE_*`), config file, defaults.
//! - Enumerated values are validated on use; unknown values are configuration
//!   errors, never silently defaulted.

use crate::calendar::WeekStart;
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "KBSTORE";

#[derive(Debug)]
pub enum ConfigError {
    /// Config file exists but cannot be read.
    Read { path: PathBuf, source: std::io::Error },
    /// Config text is not valid TOML for `CoreConfig`.
    Parse(toml::de::Error),
    /// Week start is neither `monday` nor `sunday`.
    UnknownWeekStart(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config file `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::UnknownWeekStart(value) => {
                write!(f, "unrecognized start of the week `{value}`; expected monday|sunday")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::UnknownWeekStart(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// SQLite file. `None` opens an in-memory store.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Replica id stamped on ledger entries. `None` uses the locally stored id.
    #[serde(default)]
    pub source_id: Option<String>,

    /// `monday` or `sunday`.
    #[serde(default = "default_week_start")]
    pub week_start: String,

    #[serde(default)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            source_id: None,
            week_start: default_week_start(),
            log_level: None,
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Parses TOML and applies environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: CoreConfig = toml::from_str(content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads a config file; a missing file yields defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parsed week start convention.
    pub fn week_start(&self) -> Result<WeekStart, ConfigError> {
        WeekStart::parse(&self.week_start)
    }

    /// Effective log level, falling back to the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or_else(|| crate::logging::default_log_level())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(format!("{ENV_PREFIX}_DB_PATH")) {
            self.db_path = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        if let Ok(value) = std::env::var(format!("{ENV_PREFIX}_SOURCE_ID")) {
            self.source_id = if value.is_empty() { None } else { Some(value) };
        }
        if let Ok(value) = std::env::var(format!("{ENV_PREFIX}_WEEK_START")) {
            self.week_start = value;
        }
    }
}

fn default_week_start() -> String {
    "monday".to_string()
}

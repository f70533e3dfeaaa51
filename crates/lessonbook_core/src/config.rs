//! Core configuration: where the book lives and how to log.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid config document.
//! - A missing config file yields the defaults.

use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::storage::{JsonFileStorage, SnapshotStorage, SqliteSnapshotStorage, StorageResult};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

fn default_data_file() -> PathBuf {
    PathBuf::from("data").join("lessonbook.json")
}

/// Snapshot backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Snapshot location; a JSON document or a SQLite file per `backend`.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    #[serde(default)]
    pub backend: StorageBackend,

    /// Overrides the build-mode default level.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files. No file logging when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            backend: StorageBackend::default(),
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    /// `log_dir` is not valid UTF-8.
    InvalidLogDir(PathBuf),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "malformed config json: {err}"),
            Self::InvalidLogDir(path) => {
                write!(f, "log_dir `{}` is not valid UTF-8", path.display())
            }
            Self::Logging(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::InvalidLogDir(_) => None,
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl CoreConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a config file; a missing file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json_str(&text),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Configured level, or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Starts file logging when `log_dir` is set. Returns whether it did.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let Some(log_dir) = self.log_dir.as_ref() else {
            return Ok(false);
        };
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| ConfigError::InvalidLogDir(log_dir.clone()))?;
        init_logging(self.effective_log_level(), log_dir)?;
        Ok(true)
    }

    /// Opens the configured snapshot backend.
    pub fn open_storage(&self) -> StorageResult<Box<dyn SnapshotStorage>> {
        let storage: Box<dyn SnapshotStorage> = match self.backend {
            StorageBackend::Json => Box::new(JsonFileStorage::new(&self.data_file)),
            StorageBackend::Sqlite => Box::new(SqliteSnapshotStorage::open(&self.data_file)?),
        };
        Ok(storage)
    }
}

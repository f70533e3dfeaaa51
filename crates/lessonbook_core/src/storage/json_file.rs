//! JSON file snapshot backend.
//!
//! # Invariants
//! - A missing file means "nothing saved yet", not an error.
//! - Saves go through a sibling staging file and a rename, so a crash
//!   mid-write leaves the previous snapshot intact.

use crate::storage::flat::FlatSnapshot;
use crate::storage::{SnapshotStorage, StorageError, StorageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const STAGING_SUFFIX: &str = "tmp";

/// Snapshot stored as one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(STAGING_SUFFIX);
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SnapshotStorage for JsonFileStorage {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn read_snapshot(&self) -> StorageResult<Option<FlatSnapshot>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(&self.path, err)),
        };
        let snapshot = serde_json::from_str(&text)?;
        Ok(Some(snapshot))
    }

    fn save_snapshot(&mut self, snapshot: &FlatSnapshot) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(parent, err))?;
            }
        }

        let text = serde_json::to_string_pretty(snapshot)?;
        let staging = self.staging_path();
        fs::write(&staging, text).map_err(|err| self.io_error(&staging, err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(&self.path, err))?;
        Ok(())
    }
}

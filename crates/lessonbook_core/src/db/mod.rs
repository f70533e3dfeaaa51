//! SQLite connection bootstrap and schema migrations for the snapshot backend.
//!
//! # Responsibility
//! - Open and configure snapshot database connections.
//! - Apply schema migrations in deterministic order.
//! - Attach the failing table, row or migration to every SQLite error.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Snapshot tables are never touched before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// What a snapshot table access was doing when SQLite failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    Read,
    Insert,
    Clear,
}

impl TableAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Insert => "insert",
            Self::Clear => "clear",
        }
    }
}

#[derive(Debug)]
pub enum DbError {
    /// The snapshot database could not be opened (`target` is a path or `:memory:`).
    Open {
        target: String,
        source: rusqlite::Error,
    },
    /// Connection pragmas or the busy timeout could not be applied.
    Configure(rusqlite::Error),
    /// `PRAGMA user_version` could not be read.
    SchemaVersion(rusqlite::Error),
    /// Migration `version` failed; nothing from the batch was applied.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build with a schema this one cannot read.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Beginning or committing the snapshot save transaction failed.
    Transaction {
        stage: &'static str,
        source: rusqlite::Error,
    },
    /// A snapshot table access failed. `position` is the record's place in
    /// its flat list when one row was involved.
    Table {
        table: &'static str,
        action: TableAction,
        position: Option<usize>,
        source: rusqlite::Error,
    },
}

impl DbError {
    /// Error mapper for one access to `table`.
    pub(crate) fn on_table(
        table: &'static str,
        action: TableAction,
        position: Option<usize>,
    ) -> impl Fn(rusqlite::Error) -> Self {
        move |source| Self::Table {
            table,
            action,
            position,
            source,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { target, source } => {
                write!(f, "cannot open snapshot database `{target}`: {source}")
            }
            Self::Configure(err) => write!(f, "cannot configure snapshot connection: {err}"),
            Self::SchemaVersion(err) => write!(f, "cannot read snapshot schema version: {err}"),
            Self::Migration { version, source } => {
                write!(f, "snapshot migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "snapshot schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Transaction { stage, source } => {
                write!(f, "snapshot save transaction failed to {stage}: {source}")
            }
            Self::Table {
                table,
                action,
                position: Some(position),
                source,
            } => write!(
                f,
                "{} on `{table}` failed for record #{position}: {source}",
                action.as_str()
            ),
            Self::Table {
                table,
                action,
                position: None,
                source,
            } => write!(f, "{} on `{table}` failed: {source}", action.as_str()),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. }
            | Self::Migration { source, .. }
            | Self::Transaction { source, .. }
            | Self::Table { source, .. } => Some(source),
            Self::Configure(err) | Self::SchemaVersion(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

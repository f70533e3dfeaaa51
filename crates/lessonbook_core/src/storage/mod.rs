//! Snapshot persistence: flat wire records, the codec, and backends.
//!
//! # Responsibility
//! - Move whole-book snapshots between memory and durable storage.
//! - Keep backends ignorant of the entity graph; they only see flat records.
//!
//! # Invariants
//! - A backend with nothing persisted reports `None`, never an empty error.
//! - Loading never yields a partially linked book.

use crate::db::DbError;
use crate::service::book::LessonBook;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

pub mod codec;
pub mod flat;
pub mod json_file;
pub mod sample;
pub mod sqlite;

pub use codec::{decode, encode, CodecError, CodecResult, DecodedBook};
pub use flat::{FlatLesson, FlatPerson, FlatSnapshot};
pub use json_file::JsonFileStorage;
pub use sqlite::SqliteSnapshotStorage;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Db(DbError),
    Codec(CodecError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Json(err) => write!(f, "malformed snapshot json: {err}"),
            Self::Db(err) => write!(f, "snapshot database error: {err}"),
            Self::Codec(err) => write!(f, "snapshot rejected: {err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<CodecError> for StorageError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// Durable home of one book snapshot.
pub trait SnapshotStorage {
    /// Short backend name used in log events.
    fn backend_name(&self) -> &'static str;

    /// Reads the persisted snapshot, or `None` when nothing was saved yet.
    fn read_snapshot(&self) -> StorageResult<Option<FlatSnapshot>>;

    /// Replaces the persisted snapshot as a whole.
    fn save_snapshot(&mut self, snapshot: &FlatSnapshot) -> StorageResult<()>;
}

/// Loads a book, falling back to an empty one when nothing is persisted.
///
/// # Errors
/// - Propagates backend read failures and every decode error unchanged.
pub fn load_book(storage: &dyn SnapshotStorage) -> StorageResult<LessonBook> {
    load_or_else(storage, "empty", || Ok(LessonBook::new()))
}

/// First-run load: seeds the sample book when nothing is persisted yet.
/// A stored snapshot, even an empty one, is loaded as is.
pub fn load_book_or_sample(storage: &dyn SnapshotStorage) -> StorageResult<LessonBook> {
    load_or_else(storage, "sample", || {
        Ok(LessonBook::from_snapshot(&sample::sample_snapshot())?)
    })
}

fn load_or_else(
    storage: &dyn SnapshotStorage,
    fallback_source: &'static str,
    fallback: impl FnOnce() -> StorageResult<LessonBook>,
) -> StorageResult<LessonBook> {
    let started_at = Instant::now();
    let backend = storage.backend_name();

    let result = storage.read_snapshot().and_then(|snapshot| match snapshot {
        Some(snapshot) => Ok((LessonBook::from_snapshot(&snapshot)?, "stored")),
        None => Ok((fallback()?, fallback_source)),
    });

    match result {
        Ok((book, source)) => {
            info!(
                "event=book_load module=storage status=ok backend={backend} source={source} persons={} lessons={} duration_ms={}",
                book.store().persons().len(),
                book.store().lessons().len(),
                started_at.elapsed().as_millis()
            );
            Ok(book)
        }
        Err(err) => {
            error!(
                "event=book_load module=storage status=error backend={backend} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

/// Encodes the book and hands the snapshot to the backend.
pub fn save_book(storage: &mut dyn SnapshotStorage, book: &LessonBook) -> StorageResult<()> {
    let started_at = Instant::now();
    let backend = storage.backend_name();
    let snapshot = book.snapshot();

    match storage.save_snapshot(&snapshot) {
        Ok(()) => {
            info!(
                "event=book_save module=storage status=ok backend={backend} persons={} lessons={} duration_ms={}",
                snapshot.persons.len(),
                snapshot.lessons.len(),
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=book_save module=storage status=error backend={backend} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

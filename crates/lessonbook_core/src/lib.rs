//! Record-keeping core for a private tutor: students, lessons and the
//! enrollment edges between them.
//! This crate is the single source of truth for the relationship invariant.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod store;

pub use config::{ConfigError, CoreConfig, StorageBackend};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::fields::{Day, Email, FieldError, Name, Note, Phone, Tag, Time, Venue};
pub use model::id::{EntityId, EntityKind, IdAllocator, IdError, LessonId, StudentId};
pub use model::lesson::{Lesson, LessonDraft};
pub use model::person::{Person, PersonDraft};
pub use model::Entity;
pub use service::book::{BookError, BookResult, LessonBook};
pub use service::relationship::{RelationshipSynchronizer, SyncError, SyncResult};
pub use storage::{
    load_book, load_book_or_sample, save_book, CodecError, FlatSnapshot, JsonFileStorage, SnapshotStorage,
    SqliteSnapshotStorage, StorageError, StorageResult,
};
pub use store::{BrokenEdge, EntityStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

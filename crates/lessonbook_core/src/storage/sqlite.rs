//! SQLite snapshot backend.
//!
//! # Responsibility
//! - Persist flat records row-for-row, keeping list order via `position`.
//! - Replace the stored snapshot atomically on save.
//!
//! # Invariants
//! - Each save runs in one immediate transaction.
//! - `snapshot_meta` has a row iff a snapshot has ever been saved.

use crate::db::{open_db, open_db_in_memory, DbError, TableAction};
use crate::storage::flat::{FlatLesson, FlatPerson, FlatSnapshot};
use crate::storage::{SnapshotStorage, StorageResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const PERSONS: &str = "person_records";
const LESSONS: &str = "lesson_records";
const META: &str = "snapshot_meta";

/// Snapshot stored in a migrated SQLite database.
#[derive(Debug)]
pub struct SqliteSnapshotStorage {
    conn: Connection,
}

impl SqliteSnapshotStorage {
    /// Opens (or creates) the database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn read_persons(&self) -> StorageResult<Vec<FlatPerson>> {
        let failed = |position| DbError::on_table(PERSONS, TableAction::Read, position);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT position, user_id, name, phone, email, note
                 FROM person_records
                 ORDER BY position ASC;",
            )
            .map_err(failed(None))?;
        let mut rows = stmt.query([]).map_err(failed(None))?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next().map_err(failed(None))? {
            let at = failed(Some(persons.len()));
            let position: i64 = row.get("position").map_err(&at)?;
            persons.push(FlatPerson {
                user_id: row.get("user_id").map_err(&at)?,
                name: row.get("name").map_err(&at)?,
                phone: row.get("phone").map_err(&at)?,
                email: row.get("email").map_err(&at)?,
                note: row.get("note").map_err(&at)?,
                tags: Some(load_list(
                    &self.conn,
                    "person_tags",
                    "SELECT tag FROM person_tags WHERE person_position = ?1 ORDER BY ordinal ASC;",
                    position,
                )?),
                lesson_ids: Some(load_list(
                    &self.conn,
                    "person_lesson_ids",
                    "SELECT lesson_id FROM person_lesson_ids WHERE person_position = ?1 ORDER BY ordinal ASC;",
                    position,
                )?),
            });
        }
        Ok(persons)
    }

    fn read_lessons(&self) -> StorageResult<Vec<FlatLesson>> {
        let failed = |position| DbError::on_table(LESSONS, TableAction::Read, position);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT position, lesson_id, day, start_time, end_time, venue, note
                 FROM lesson_records
                 ORDER BY position ASC;",
            )
            .map_err(failed(None))?;
        let mut rows = stmt.query([]).map_err(failed(None))?;
        let mut lessons = Vec::new();
        while let Some(row) = rows.next().map_err(failed(None))? {
            let at = failed(Some(lessons.len()));
            let position: i64 = row.get("position").map_err(&at)?;
            lessons.push(FlatLesson {
                lesson_id: row.get("lesson_id").map_err(&at)?,
                day: row.get("day").map_err(&at)?,
                start_time: row.get("start_time").map_err(&at)?,
                end_time: row.get("end_time").map_err(&at)?,
                venue: row.get("venue").map_err(&at)?,
                note: row.get("note").map_err(&at)?,
                student_ids: Some(load_list(
                    &self.conn,
                    "lesson_student_ids",
                    "SELECT student_id FROM lesson_student_ids WHERE lesson_position = ?1 ORDER BY ordinal ASC;",
                    position,
                )?),
            });
        }
        Ok(lessons)
    }
}

impl SnapshotStorage for SqliteSnapshotStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn read_snapshot(&self) -> StorageResult<Option<FlatSnapshot>> {
        let saved_at: Option<i64> = self
            .conn
            .query_row("SELECT saved_at FROM snapshot_meta WHERE id = 1;", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(DbError::on_table(META, TableAction::Read, None))?;
        if saved_at.is_none() {
            return Ok(None);
        }

        Ok(Some(FlatSnapshot {
            persons: self.read_persons()?,
            lessons: self.read_lessons()?,
        }))
    }

    fn save_snapshot(&mut self, snapshot: &FlatSnapshot) -> StorageResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| DbError::Transaction {
                stage: "begin",
                source,
            })?;

        // Child rows go with their parents via ON DELETE CASCADE.
        tx.execute("DELETE FROM person_records;", [])
            .map_err(DbError::on_table(PERSONS, TableAction::Clear, None))?;
        tx.execute("DELETE FROM lesson_records;", [])
            .map_err(DbError::on_table(LESSONS, TableAction::Clear, None))?;

        for (position, person) in snapshot.persons.iter().enumerate() {
            let failed = |table: &'static str| {
                DbError::on_table(table, TableAction::Insert, Some(position))
            };
            tx.execute(
                "INSERT INTO person_records (position, user_id, name, phone, email, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    position,
                    person.user_id,
                    person.name,
                    person.phone,
                    person.email,
                    person.note
                ],
            )
            .map_err(failed(PERSONS))?;
            for (ordinal, tag) in person.tags.iter().flatten().enumerate() {
                tx.execute(
                    "INSERT INTO person_tags (person_position, ordinal, tag) VALUES (?1, ?2, ?3);",
                    params![position, ordinal, tag],
                )
                .map_err(failed("person_tags"))?;
            }
            for (ordinal, lesson_id) in person.lesson_ids.iter().flatten().enumerate() {
                tx.execute(
                    "INSERT INTO person_lesson_ids (person_position, ordinal, lesson_id) VALUES (?1, ?2, ?3);",
                    params![position, ordinal, lesson_id],
                )
                .map_err(failed("person_lesson_ids"))?;
            }
        }

        for (position, lesson) in snapshot.lessons.iter().enumerate() {
            let failed = |table: &'static str| {
                DbError::on_table(table, TableAction::Insert, Some(position))
            };
            tx.execute(
                "INSERT INTO lesson_records (position, lesson_id, day, start_time, end_time, venue, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    position,
                    lesson.lesson_id,
                    lesson.day,
                    lesson.start_time,
                    lesson.end_time,
                    lesson.venue,
                    lesson.note
                ],
            )
            .map_err(failed(LESSONS))?;
            for (ordinal, student_id) in lesson.student_ids.iter().flatten().enumerate() {
                tx.execute(
                    "INSERT INTO lesson_student_ids (lesson_position, ordinal, student_id) VALUES (?1, ?2, ?3);",
                    params![position, ordinal, student_id],
                )
                .map_err(failed("lesson_student_ids"))?;
            }
        }

        tx.execute(
            "INSERT INTO snapshot_meta (id, saved_at, person_count, lesson_count)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                saved_at = excluded.saved_at,
                person_count = excluded.person_count,
                lesson_count = excluded.lesson_count;",
            params![
                now_epoch_ms(),
                snapshot.persons.len(),
                snapshot.lessons.len()
            ],
        )
        .map_err(DbError::on_table(META, TableAction::Insert, None))?;
        tx.commit().map_err(|source| DbError::Transaction {
            stage: "commit",
            source,
        })?;
        Ok(())
    }
}

fn load_list<T: rusqlite::types::FromSql>(
    conn: &Connection,
    table: &'static str,
    sql: &str,
    position: i64,
) -> StorageResult<Vec<T>> {
    let failed = DbError::on_table(table, TableAction::Read, usize::try_from(position).ok());
    let mut stmt = conn.prepare(sql).map_err(&failed)?;
    let mut rows = stmt.query([position]).map_err(&failed)?;
    let mut values = Vec::new();
    while let Some(row) = rows.next().map_err(&failed)? {
        values.push(row.get(0).map_err(&failed)?);
    }
    Ok(values)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::SqliteSnapshotStorage;
    use crate::storage::{FlatLesson, FlatPerson, FlatSnapshot, SnapshotStorage};

    #[test]
    fn fresh_database_has_no_snapshot() {
        let storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        assert!(storage.read_snapshot().unwrap().is_none());
    }

    #[test]
    fn saved_empty_snapshot_is_distinguished_from_nothing_saved() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        storage.save_snapshot(&FlatSnapshot::default()).unwrap();
        assert_eq!(storage.read_snapshot().unwrap(), Some(FlatSnapshot::default()));
    }

    #[test]
    fn null_scalars_survive_a_save() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        let snapshot = FlatSnapshot {
            persons: vec![FlatPerson {
                user_id: Some(2),
                name: None,
                tags: Some(vec!["b".to_string(), "a".to_string()]),
                lesson_ids: Some(vec![]),
                ..FlatPerson::default()
            }],
            lessons: vec![FlatLesson {
                lesson_id: None,
                student_ids: Some(vec![2]),
                ..FlatLesson::default()
            }],
        };

        storage.save_snapshot(&snapshot).unwrap();
        assert_eq!(storage.read_snapshot().unwrap(), Some(snapshot));
    }

    #[test]
    fn resave_replaces_previous_rows() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        let first = FlatSnapshot {
            persons: vec![FlatPerson {
                user_id: Some(1),
                tags: Some(vec![]),
                lesson_ids: Some(vec![]),
                ..FlatPerson::default()
            }],
            lessons: vec![],
        };
        storage.save_snapshot(&first).unwrap();
        storage.save_snapshot(&FlatSnapshot::default()).unwrap();

        let count: i64 = storage
            .connection()
            .query_row("SELECT COUNT(*) FROM person_tags;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(storage.read_snapshot().unwrap(), Some(FlatSnapshot::default()));
    }
}

//! Book facade: the entity store plus its two id allocators.
//!
//! # Responsibility
//! - Provide the create/edit/delete/enroll/withdraw entry points callers use.
//! - Own the id allocators so new ids never collide with loaded ones.
//!
//! # Invariants
//! - Every mutation goes through the relationship synchronizer.
//! - Allocators are seeded before the book is handed out.
//! - Edits never take a relationship set from the caller.

use crate::model::fields::FieldError;
use crate::model::id::{EntityId, IdAllocator, IdError, LessonId, StudentId};
use crate::model::lesson::{Lesson, LessonDraft};
use crate::model::person::{Person, PersonDraft};
use crate::service::relationship::{RelationshipSynchronizer, SyncError};
use crate::storage::codec::{self, CodecResult, DecodedBook};
use crate::storage::flat::FlatSnapshot;
use crate::store::{EntityStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BookResult<T> = Result<T, BookError>;

/// Facade errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    Id(IdError),
    Store(StoreError),
    Sync(SyncError),
    Validation(FieldError),
    /// `enroll` on an existing edge.
    AlreadyEnrolled { student_id: StudentId, lesson_id: LessonId },
    /// `withdraw` on a missing edge.
    NotEnrolled { student_id: StudentId, lesson_id: LessonId },
}

impl Display for BookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::AlreadyEnrolled {
                student_id,
                lesson_id,
            } => write!(f, "student {student_id} is already enrolled in lesson {lesson_id}"),
            Self::NotEnrolled {
                student_id,
                lesson_id,
            } => write!(f, "student {student_id} is not enrolled in lesson {lesson_id}"),
        }
    }
}

impl Error for BookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Id(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::AlreadyEnrolled { .. } | Self::NotEnrolled { .. } => None,
        }
    }
}

impl From<IdError> for BookError {
    fn from(value: IdError) -> Self {
        Self::Id(value)
    }
}

impl From<StoreError> for BookError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<SyncError> for BookError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

impl From<FieldError> for BookError {
    fn from(value: FieldError) -> Self {
        Self::Validation(value)
    }
}

/// Students, lessons and the allocators that name them.
#[derive(Debug, Clone)]
pub struct LessonBook {
    store: EntityStore,
    student_ids: IdAllocator<StudentId>,
    lesson_ids: IdAllocator<LessonId>,
}

impl Default for LessonBook {
    fn default() -> Self {
        Self::new()
    }
}

impl LessonBook {
    /// Empty book; the first id of each kind is 0.
    pub fn new() -> Self {
        Self {
            store: EntityStore::new(),
            student_ids: IdAllocator::fresh(),
            lesson_ids: IdAllocator::fresh(),
        }
    }

    /// Decodes a flat snapshot into a linked, seeded book.
    pub fn from_snapshot(snapshot: &FlatSnapshot) -> CodecResult<Self> {
        let DecodedBook {
            store,
            student_ids,
            lesson_ids,
        } = codec::decode(snapshot)?;
        Ok(Self {
            store,
            student_ids,
            lesson_ids,
        })
    }

    /// Flattens the book for persistence.
    pub fn snapshot(&self) -> FlatSnapshot {
        codec::encode(&self.store)
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Next student id `create_person` would assign.
    pub fn next_student_id(&self) -> Option<StudentId> {
        self.student_ids.peek()
    }

    /// Next lesson id `create_lesson` would assign.
    pub fn next_lesson_id(&self) -> Option<LessonId> {
        self.lesson_ids.peek()
    }

    /// Adds a student under a fresh id. The id is only consumed on success.
    pub fn create_person(&mut self, draft: PersonDraft) -> BookResult<StudentId> {
        let mut allocator = self.student_ids.clone();
        let id = allocator.next()?;
        self.store.add_person(draft.into_person(id))?;
        self.student_ids = allocator;
        log_create(id);
        Ok(id)
    }

    /// Adds a lesson under a fresh id. The id is only consumed on success.
    ///
    /// # Errors
    /// - `Validation` when the draft's end time is before its start time.
    pub fn create_lesson(&mut self, draft: LessonDraft) -> BookResult<LessonId> {
        let mut allocator = self.lesson_ids.clone();
        let id = allocator.next()?;
        self.store.add_lesson(draft.into_lesson(id)?)?;
        self.lesson_ids = allocator;
        log_create(id);
        Ok(id)
    }

    /// Replaces a student's attributes. Enrollments are kept as they are.
    /// Returns the record before the edit.
    pub fn edit_person(&mut self, id: StudentId, draft: PersonDraft) -> BookResult<Person> {
        let edited = draft.into_person(id);
        Ok(self.synchronizer().edit_person(id, edited)?)
    }

    /// Replaces a lesson's attributes. Enrolled students are kept.
    pub fn edit_lesson(&mut self, id: LessonId, draft: LessonDraft) -> BookResult<Lesson> {
        let edited = draft.into_lesson(id)?;
        Ok(self.synchronizer().edit_lesson(id, edited)?)
    }

    /// Removes a student and withdraws it from every lesson.
    pub fn delete_person(&mut self, id: StudentId) -> BookResult<Person> {
        Ok(self.synchronizer().delete_person(id)?)
    }

    /// Removes a lesson and withdraws every student from it.
    pub fn delete_lesson(&mut self, id: LessonId) -> BookResult<Lesson> {
        Ok(self.synchronizer().delete_lesson(id)?)
    }

    /// # Errors
    /// - `AlreadyEnrolled` when the edge exists.
    /// - `Sync(EntityNotRegistered)` when either side is unknown.
    pub fn enroll(&mut self, student_id: StudentId, lesson_id: LessonId) -> BookResult<()> {
        let mut sync = self.synchronizer();
        if sync.is_enrolled(student_id, lesson_id)? {
            return Err(BookError::AlreadyEnrolled {
                student_id,
                lesson_id,
            });
        }
        Ok(sync.enroll(student_id, lesson_id)?)
    }

    /// # Errors
    /// - `NotEnrolled` when the edge does not exist.
    /// - `Sync(EntityNotRegistered)` when either side is unknown.
    pub fn withdraw(&mut self, student_id: StudentId, lesson_id: LessonId) -> BookResult<()> {
        let mut sync = self.synchronizer();
        if !sync.is_enrolled(student_id, lesson_id)? {
            return Err(BookError::NotEnrolled {
                student_id,
                lesson_id,
            });
        }
        Ok(sync.withdraw(student_id, lesson_id)?)
    }

    fn synchronizer(&mut self) -> RelationshipSynchronizer<'_> {
        RelationshipSynchronizer::new(&mut self.store)
    }
}

fn log_create<I: EntityId>(id: I) {
    info!(
        "event=entity_create module=book status=ok kind={} id={}",
        I::KIND,
        id.value()
    );
}

#[cfg(test)]
mod tests {
    use super::{BookError, LessonBook};
    use crate::model::fields::{Day, Email, FieldError, Name, Note, Phone, Time, Venue};
    use crate::model::id::{LessonId, StudentId};
    use crate::model::lesson::LessonDraft;
    use crate::model::person::PersonDraft;
    use std::collections::BTreeSet;

    fn person_draft(name: &str) -> PersonDraft {
        PersonDraft {
            name: Name::parse(name).unwrap(),
            phone: Phone::parse("91234567").unwrap(),
            email: Email::parse("someone@example.com").unwrap(),
            note: Note::default(),
            tags: BTreeSet::new(),
        }
    }

    fn lesson_draft(start: &str, end: &str) -> LessonDraft {
        LessonDraft {
            day: Day::Wed,
            start_time: Time::parse(start).unwrap(),
            end_time: Time::parse(end).unwrap(),
            venue: Venue::new("Room 2"),
            note: Note::default(),
        }
    }

    #[test]
    fn invalid_lesson_draft_does_not_consume_an_id() {
        let mut book = LessonBook::new();
        let err = book.create_lesson(lesson_draft("1200", "1100")).unwrap_err();
        assert!(matches!(
            err,
            BookError::Validation(FieldError::EndBeforeStart { .. })
        ));
        assert_eq!(
            book.create_lesson(lesson_draft("1000", "1100")).unwrap(),
            LessonId::new(0)
        );
    }

    #[test]
    fn enroll_twice_reports_already_enrolled() {
        let mut book = LessonBook::new();
        let student = book.create_person(person_draft("Amy")).unwrap();
        let lesson = book.create_lesson(lesson_draft("0900", "1000")).unwrap();

        book.enroll(student, lesson).unwrap();
        assert_eq!(
            book.enroll(student, lesson).unwrap_err(),
            BookError::AlreadyEnrolled {
                student_id: student,
                lesson_id: lesson
            }
        );
    }

    #[test]
    fn withdraw_without_edge_reports_not_enrolled() {
        let mut book = LessonBook::new();
        let student = book.create_person(person_draft("Amy")).unwrap();
        let lesson = book.create_lesson(lesson_draft("0900", "1000")).unwrap();

        assert!(matches!(
            book.withdraw(student, lesson).unwrap_err(),
            BookError::NotEnrolled { .. }
        ));
        assert_eq!(book.next_student_id(), Some(StudentId::new(1)));
    }
}

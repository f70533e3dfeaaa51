//! Id-unique entity tables and the two-table entity store.
//!
//! # Responsibility
//! - Own the canonical `Person` and `Lesson` records.
//! - Answer "does X exist" and perform "replace X with Y".
//!
//! # Invariants
//! - A table never holds two records with the same id.
//! - Iteration order is ascending id.
//! - Relationship sets are not touched here; see `service::relationship`.

use crate::model::id::{EntityId, EntityKind, LessonId, StudentId};
use crate::model::lesson::Lesson;
use crate::model::person::Person;
use crate::model::{Entity, Linked};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity store errors. All are caller-recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with the same id is already stored.
    DuplicateEntity { kind: EntityKind, id: u32 },
    /// No record with this id is stored.
    NotFound { kind: EntityKind, id: u32 },
    /// `replace` was given a record whose id differs from the target.
    IdentityMismatch {
        kind: EntityKind,
        expected: u32,
        actual: u32,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEntity { kind, id } => write!(f, "{kind} {id} already exists"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::IdentityMismatch {
                kind,
                expected,
                actual,
            } => write!(
                f,
                "{kind} replacement must keep id {expected}, got {actual}"
            ),
        }
    }
}

impl Error for StoreError {}

/// Edge present on only one side of the relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenEdge {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    /// Side that lists the edge. The other side is missing it.
    pub listed_by: EntityKind,
}

impl Display for BrokenEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (missing_kind, missing_id) = match self.listed_by {
            EntityKind::Person => (EntityKind::Lesson, self.lesson_id.value()),
            EntityKind::Lesson => (EntityKind::Person, self.student_id.value()),
        };
        write!(
            f,
            "edge student={} lesson={} listed by {} but not mirrored by {missing_kind} {missing_id}",
            self.student_id.value(),
            self.lesson_id.value(),
            self.listed_by
        )
    }
}

/// One id-unique collection of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTable<E: Entity> {
    records: BTreeMap<E::Id, E>,
}

impl<E: Entity> Default for EntityTable<E> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<E: Entity> EntityTable<E> {
    /// Inserts a new record.
    ///
    /// # Errors
    /// - `DuplicateEntity` when the id is already present.
    pub fn add(&mut self, record: E) -> StoreResult<()> {
        match self.records.entry(record.id()) {
            Entry::Occupied(entry) => Err(duplicate::<E>(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    /// Removes and returns the record so callers can clean up partners.
    pub fn remove(&mut self, id: E::Id) -> StoreResult<E> {
        self.records.remove(&id).ok_or_else(|| not_found::<E>(id))
    }

    /// Replaces `target` with `edited`, returning the previous record.
    ///
    /// # Errors
    /// - `NotFound` when `target` is absent.
    /// - `IdentityMismatch` when `edited` carries another id.
    pub fn replace(&mut self, target: E::Id, edited: E) -> StoreResult<E> {
        let slot = self
            .records
            .get_mut(&target)
            .ok_or_else(|| not_found::<E>(target))?;
        if !edited.is_same(slot) {
            return Err(StoreError::IdentityMismatch {
                kind: E::Id::KIND,
                expected: target.value(),
                actual: edited.id().value(),
            });
        }
        Ok(std::mem::replace(slot, edited))
    }

    /// Replaces `target` with a record that may carry a different id.
    ///
    /// # Errors
    /// - `NotFound` when `target` is absent.
    /// - `DuplicateEntity` when the new id belongs to another record.
    pub fn replace_with_identity_change(&mut self, target: E::Id, edited: E) -> StoreResult<E> {
        if !self.records.contains_key(&target) {
            return Err(not_found::<E>(target));
        }
        let new_id = edited.id();
        if new_id != target && self.records.contains_key(&new_id) {
            return Err(duplicate::<E>(new_id));
        }
        let previous = self.records.remove(&target).ok_or_else(|| not_found::<E>(target))?;
        self.records.insert(new_id, edited);
        Ok(previous)
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: E::Id) -> Option<&E> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.records.values()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = E::Id> + '_ {
        self.records.keys().copied()
    }

    /// Highest stored id, if any.
    pub fn max_id(&self) -> Option<E::Id> {
        self.records.keys().next_back().copied()
    }

    pub(crate) fn get_mut(&mut self, id: E::Id) -> Option<&mut E>
    where
        E: Linked,
    {
        self.records.get_mut(&id)
    }
}

fn duplicate<E: Entity>(id: E::Id) -> StoreError {
    StoreError::DuplicateEntity {
        kind: E::Id::KIND,
        id: id.value(),
    }
}

fn not_found<E: Entity>(id: E::Id) -> StoreError {
    StoreError::NotFound {
        kind: E::Id::KIND,
        id: id.value(),
    }
}

/// Canonical in-memory collections of students and lessons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    persons: EntityTable<Person>,
    lessons: EntityTable<Lesson>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persons(&self) -> &EntityTable<Person> {
        &self.persons
    }

    pub fn lessons(&self) -> &EntityTable<Lesson> {
        &self.lessons
    }

    pub fn add_person(&mut self, person: Person) -> StoreResult<()> {
        self.persons.add(person)
    }

    pub fn remove_person(&mut self, id: StudentId) -> StoreResult<Person> {
        self.persons.remove(id)
    }

    pub fn replace_person(&mut self, target: StudentId, edited: Person) -> StoreResult<Person> {
        self.persons.replace(target, edited)
    }

    /// Identity-changing replace. Partner sets still name the old id until
    /// the caller runs `RelationshipSynchronizer::on_person_edit`.
    pub fn replace_person_with_identity_change(
        &mut self,
        target: StudentId,
        edited: Person,
    ) -> StoreResult<Person> {
        self.persons.replace_with_identity_change(target, edited)
    }

    pub fn contains_person(&self, id: StudentId) -> bool {
        self.persons.contains(id)
    }

    pub fn get_person(&self, id: StudentId) -> Option<&Person> {
        self.persons.get(id)
    }

    pub fn add_lesson(&mut self, lesson: Lesson) -> StoreResult<()> {
        self.lessons.add(lesson)
    }

    pub fn remove_lesson(&mut self, id: LessonId) -> StoreResult<Lesson> {
        self.lessons.remove(id)
    }

    pub fn replace_lesson(&mut self, target: LessonId, edited: Lesson) -> StoreResult<Lesson> {
        self.lessons.replace(target, edited)
    }

    /// Identity-changing replace. Partner sets still name the old id until
    /// the caller runs `RelationshipSynchronizer::on_lesson_edit`.
    pub fn replace_lesson_with_identity_change(
        &mut self,
        target: LessonId,
        edited: Lesson,
    ) -> StoreResult<Lesson> {
        self.lessons.replace_with_identity_change(target, edited)
    }

    pub fn contains_lesson(&self, id: LessonId) -> bool {
        self.lessons.contains(id)
    }

    pub fn get_lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.get(id)
    }

    /// Lessons a student is enrolled in, resolved through the store.
    pub fn lessons_of(&self, id: StudentId) -> Vec<&Lesson> {
        self.persons
            .get(id)
            .map(|person| {
                person
                    .lessons()
                    .iter()
                    .filter_map(|lesson_id| self.lessons.get(*lesson_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Students enrolled in a lesson, resolved through the store.
    pub fn students_of(&self, id: LessonId) -> Vec<&Person> {
        self.lessons
            .get(id)
            .map(|lesson| {
                lesson
                    .students()
                    .iter()
                    .filter_map(|student_id| self.persons.get(*student_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Verifies `P.lessons ∋ L ⇔ L.students ∋ P` over the whole store.
    ///
    /// Returns the first broken edge in ascending id order.
    pub fn check_consistency(&self) -> Result<(), BrokenEdge> {
        for person in self.persons.iter() {
            for lesson_id in person.lessons() {
                let mirrored = self
                    .lessons
                    .get(*lesson_id)
                    .is_some_and(|lesson| lesson.has_student(person.id()));
                if !mirrored {
                    return Err(BrokenEdge {
                        student_id: person.id(),
                        lesson_id: *lesson_id,
                        listed_by: EntityKind::Person,
                    });
                }
            }
        }
        for lesson in self.lessons.iter() {
            for student_id in lesson.students() {
                let mirrored = self
                    .persons
                    .get(*student_id)
                    .is_some_and(|person| person.has_lesson(lesson.id()));
                if !mirrored {
                    return Err(BrokenEdge {
                        student_id: *student_id,
                        lesson_id: lesson.id(),
                        listed_by: EntityKind::Lesson,
                    });
                }
            }
        }
        Ok(())
    }

    /// Builds a store from already id-indexed records. Used by the decoder,
    /// which has checked uniqueness while indexing.
    pub(crate) fn from_records(
        persons: BTreeMap<StudentId, Person>,
        lessons: BTreeMap<LessonId, Lesson>,
    ) -> Self {
        Self {
            persons: EntityTable { records: persons },
            lessons: EntityTable { records: lessons },
        }
    }

    pub(crate) fn tables_mut(&mut self) -> (&mut EntityTable<Person>, &mut EntityTable<Lesson>) {
        (&mut self.persons, &mut self.lessons)
    }
}

/// Selects the own and partner tables for one record type.
pub(crate) trait Stored: Linked + Sized {
    type Partner: Linked<Id = Self::PartnerId, PartnerId = Self::Id>;

    fn split(store: &mut EntityStore) -> (&mut EntityTable<Self>, &mut EntityTable<Self::Partner>);
}

impl Stored for Person {
    type Partner = Lesson;

    fn split(store: &mut EntityStore) -> (&mut EntityTable<Person>, &mut EntityTable<Lesson>) {
        store.tables_mut()
    }
}

impl Stored for Lesson {
    type Partner = Person;

    fn split(store: &mut EntityStore) -> (&mut EntityTable<Lesson>, &mut EntityTable<Person>) {
        let (persons, lessons) = store.tables_mut();
        (lessons, persons)
    }
}

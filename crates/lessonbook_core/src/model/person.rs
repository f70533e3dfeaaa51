//! Student (`Person`) domain record.
//!
//! # Invariants
//! - `id` is stable and never reused for another student.
//! - `lessons` is only mutated by the relationship synchronizer and the
//!   decoder, so it always mirrors the enrolled lessons' student sets.

use crate::model::fields::{Email, Name, Note, Phone, Tag};
use crate::model::id::{LessonId, StudentId};
use crate::model::{Entity, Linked};
use std::collections::BTreeSet;

/// Canonical student record.
///
/// `PartialEq` is full-value equality (attributes and enrolled lessons).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    id: StudentId,
    pub name: Name,
    pub phone: Phone,
    pub email: Email,
    pub note: Note,
    pub tags: BTreeSet<Tag>,
    lessons: BTreeSet<LessonId>,
}

impl Person {
    /// Creates a student with no enrolled lessons.
    pub fn new(
        id: StudentId,
        name: Name,
        phone: Phone,
        email: Email,
        note: Note,
        tags: impl IntoIterator<Item = Tag>,
    ) -> Self {
        Self {
            id,
            name,
            phone,
            email,
            note,
            tags: tags.into_iter().collect(),
            lessons: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> StudentId {
        self.id
    }

    /// Lessons this student is enrolled in.
    pub fn lessons(&self) -> &BTreeSet<LessonId> {
        &self.lessons
    }

    pub fn has_lesson(&self, lesson_id: LessonId) -> bool {
        self.lessons.contains(&lesson_id)
    }
}

impl Entity for Person {
    type Id = StudentId;
    type PartnerId = LessonId;

    fn id(&self) -> StudentId {
        self.id
    }

    fn partners(&self) -> &BTreeSet<LessonId> {
        &self.lessons
    }
}

impl Linked for Person {
    fn partners_mut(&mut self) -> &mut BTreeSet<LessonId> {
        &mut self.lessons
    }
}

/// Student attributes without identity, used for create and edit flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonDraft {
    pub name: Name,
    pub phone: Phone,
    pub email: Email,
    pub note: Note,
    pub tags: BTreeSet<Tag>,
}

impl PersonDraft {
    /// Binds the draft to an id. The lesson set always starts empty; edit
    /// flows recompute it from the record being replaced.
    pub fn into_person(self, id: StudentId) -> Person {
        Person::new(id, self.name, self.phone, self.email, self.note, self.tags)
    }
}

impl From<&Person> for PersonDraft {
    fn from(person: &Person) -> Self {
        Self {
            name: person.name.clone(),
            phone: person.phone.clone(),
            email: person.email.clone(),
            note: person.note.clone(),
            tags: person.tags.clone(),
        }
    }
}

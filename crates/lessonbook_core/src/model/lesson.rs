//! Lesson domain record.
//!
//! # Invariants
//! - `id` is stable and never reused for another lesson.
//! - `start_time <= end_time`.
//! - `students` mirrors the enrolled students' lesson sets.

use crate::model::fields::{Day, FieldError, Note, Time, Venue};
use crate::model::id::{LessonId, StudentId};
use crate::model::{Entity, Linked};
use std::collections::BTreeSet;

/// Canonical lesson record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    pub day: Day,
    start_time: Time,
    end_time: Time,
    pub venue: Venue,
    pub note: Note,
    students: BTreeSet<StudentId>,
}

impl Lesson {
    /// Creates a lesson with no enrolled students.
    ///
    /// # Errors
    /// - `EndBeforeStart` when `end_time` is earlier than `start_time`.
    pub fn new(
        id: LessonId,
        day: Day,
        start_time: Time,
        end_time: Time,
        venue: Venue,
        note: Note,
    ) -> Result<Self, FieldError> {
        validate_window(start_time, end_time)?;
        Ok(Self {
            id,
            day,
            start_time,
            end_time,
            venue,
            note,
            students: BTreeSet::new(),
        })
    }

    pub fn id(&self) -> LessonId {
        self.id
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    pub fn end_time(&self) -> Time {
        self.end_time
    }

    /// Students enrolled in this lesson.
    pub fn students(&self) -> &BTreeSet<StudentId> {
        &self.students
    }

    pub fn has_student(&self, student_id: StudentId) -> bool {
        self.students.contains(&student_id)
    }
}

impl Entity for Lesson {
    type Id = LessonId;
    type PartnerId = StudentId;

    fn id(&self) -> LessonId {
        self.id
    }

    fn partners(&self) -> &BTreeSet<StudentId> {
        &self.students
    }
}

impl Linked for Lesson {
    fn partners_mut(&mut self) -> &mut BTreeSet<StudentId> {
        &mut self.students
    }
}

fn validate_window(start_time: Time, end_time: Time) -> Result<(), FieldError> {
    if end_time < start_time {
        return Err(FieldError::EndBeforeStart {
            start: start_time,
            end: end_time,
        });
    }
    Ok(())
}

/// Lesson attributes without identity, used for create and edit flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub day: Day,
    pub start_time: Time,
    pub end_time: Time,
    pub venue: Venue,
    pub note: Note,
}

impl LessonDraft {
    /// Binds the draft to an id with an empty student set.
    pub fn into_lesson(self, id: LessonId) -> Result<Lesson, FieldError> {
        Lesson::new(
            id,
            self.day,
            self.start_time,
            self.end_time,
            self.venue,
            self.note,
        )
    }
}

impl From<&Lesson> for LessonDraft {
    fn from(lesson: &Lesson) -> Self {
        Self {
            day: lesson.day,
            start_time: lesson.start_time,
            end_time: lesson.end_time,
            venue: lesson.venue.clone(),
            note: lesson.note.clone(),
        }
    }
}

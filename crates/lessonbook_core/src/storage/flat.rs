//! Flat on-disk records.
//!
//! Relationships are plain integer id lists. Every scalar is optional at
//! this layer so the decoder can report the exact wire field that is
//! missing or null instead of a generic serde error.

use crate::model::lesson::Lesson;
use crate::model::person::Person;
use crate::model::id::EntityId;
use serde::{Deserialize, Serialize};

/// Whole persisted book: two flat lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatSnapshot {
    #[serde(default)]
    pub persons: Vec<FlatPerson>,
    #[serde(default)]
    pub lessons: Vec<FlatLesson>,
}

impl FlatSnapshot {
    pub fn is_empty(&self) -> bool {
        self.persons.is_empty() && self.lessons.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatPerson {
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
    pub lesson_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatLesson {
    pub lesson_id: Option<i64>,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub venue: Option<String>,
    pub note: Option<String>,
    pub student_ids: Option<Vec<i64>>,
}

impl From<&Person> for FlatPerson {
    fn from(person: &Person) -> Self {
        Self {
            user_id: Some(i64::from(person.id().value())),
            name: Some(person.name.as_str().to_string()),
            phone: Some(person.phone.as_str().to_string()),
            email: Some(person.email.as_str().to_string()),
            note: Some(person.note.as_str().to_string()),
            tags: Some(person.tags.iter().map(|tag| tag.as_str().to_string()).collect()),
            lesson_ids: Some(
                person
                    .lessons()
                    .iter()
                    .map(|id| i64::from(id.value()))
                    .collect(),
            ),
        }
    }
}

impl From<&Lesson> for FlatLesson {
    fn from(lesson: &Lesson) -> Self {
        Self {
            lesson_id: Some(i64::from(lesson.id().value())),
            day: Some(lesson.day.as_str().to_string()),
            start_time: Some(lesson.start_time().to_string()),
            end_time: Some(lesson.end_time().to_string()),
            venue: Some(lesson.venue.as_str().to_string()),
            note: Some(lesson.note.as_str().to_string()),
            student_ids: Some(
                lesson
                    .students()
                    .iter()
                    .map(|id| i64::from(id.value()))
                    .collect(),
            ),
        }
    }
}

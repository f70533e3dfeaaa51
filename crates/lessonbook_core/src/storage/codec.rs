//! Conversion between the in-memory entity graph and the flat snapshot.
//!
//! # Responsibility
//! - Flatten the store into two id-ordered record lists.
//! - Rebuild a fully linked store from flat records in two passes.
//! - Seed both id allocators from the loaded ids.
//!
//! # Invariants
//! - Decode is all-or-nothing: any error aborts without a partial graph.
//! - A decoded store always satisfies the bidirectional edge invariant.
//! - Allocators are seeded to `max(id) + 1`, or 0 for an empty kind. A kind
//!   holding the largest representable id loads with an exhausted allocator.

use crate::model::fields::{Day, Email, FieldError, Name, Note, Phone, Tag, Time, Venue};
use crate::model::id::{EntityId, EntityKind, IdAllocator, LessonId, StudentId};
use crate::model::lesson::Lesson;
use crate::model::person::Person;
use crate::model::{Entity, Linked};
use crate::storage::flat::{FlatLesson, FlatPerson, FlatSnapshot};
use crate::store::{BrokenEdge, EntityStore};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CodecResult<T> = Result<T, CodecError>;

/// Decode failures. Each one aborts the whole load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Two records of the same kind share an id.
    DuplicateEntity { kind: EntityKind, id: u32 },
    /// A required scalar is missing, null or fails validation.
    InvalidField {
        kind: EntityKind,
        /// Position of the record in its flat list.
        index: usize,
        /// Wire name of the offending field.
        field: &'static str,
        reason: String,
    },
    /// A relationship list names an id that no record of the other kind has.
    DanglingReference {
        kind: EntityKind,
        id: u32,
        missing_kind: EntityKind,
        missing_id: u32,
    },
    /// An edge is listed by one side only.
    AsymmetricEdge(BrokenEdge),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEntity { kind, id } => {
                write!(f, "snapshot contains duplicate {kind} id {id}")
            }
            Self::InvalidField {
                kind,
                index,
                field,
                reason,
            } => write!(f, "{kind} record #{index}: field `{field}` {reason}"),
            Self::DanglingReference {
                kind,
                id,
                missing_kind,
                missing_id,
            } => write!(
                f,
                "{kind} {id} references unknown {missing_kind} {missing_id}"
            ),
            Self::AsymmetricEdge(edge) => write!(f, "asymmetric relationship: {edge}"),
        }
    }
}

impl Error for CodecError {}

/// Result of a successful decode: the linked store and seeded allocators.
#[derive(Debug, Clone)]
pub struct DecodedBook {
    pub store: EntityStore,
    pub student_ids: IdAllocator<StudentId>,
    pub lesson_ids: IdAllocator<LessonId>,
}

/// Flattens the store. Both lists and every id list are in ascending order.
pub fn encode(store: &EntityStore) -> FlatSnapshot {
    FlatSnapshot {
        persons: store.persons().iter().map(FlatPerson::from).collect(),
        lessons: store.lessons().iter().map(FlatLesson::from).collect(),
    }
}

/// Rebuilds a linked store from a flat snapshot.
///
/// # Errors
/// - `InvalidField` on a missing, null or invalid scalar.
/// - `DuplicateEntity` on a repeated id within one kind.
/// - `DanglingReference` on a relationship id with no matching record.
/// - `AsymmetricEdge` when an edge is listed on one side only.
pub fn decode(snapshot: &FlatSnapshot) -> CodecResult<DecodedBook> {
    let persons = materialize_all(&snapshot.persons, materialize_person)?;
    let lessons = materialize_all(&snapshot.lessons, materialize_lesson)?;

    let patched_persons = patch(persons, &lessons)?;
    let patched_lessons = patch(lessons, &patched_persons)?;

    let store = EntityStore::from_records(patched_persons, patched_lessons);
    store
        .check_consistency()
        .map_err(CodecError::AsymmetricEdge)?;

    let student_ids = allocator_after(store.persons().max_id());
    let lesson_ids = allocator_after(store.lessons().max_id());
    Ok(DecodedBook {
        store,
        student_ids,
        lesson_ids,
    })
}

/// Partner stand-in holding only the id read from the wire.
#[derive(Debug, Clone, Copy)]
struct Placeholder<I> {
    id: I,
}

/// Record built from scalars whose relationship set is still unresolved.
#[derive(Debug)]
struct Materialized<E: Entity> {
    record: E,
    placeholders: Vec<Placeholder<E::PartnerId>>,
}

fn materialize_all<R, E, F>(records: &[R], build: F) -> CodecResult<BTreeMap<E::Id, Materialized<E>>>
where
    E: Entity,
    F: Fn(usize, &R) -> CodecResult<Materialized<E>>,
{
    let mut index = BTreeMap::new();
    for (position, raw) in records.iter().enumerate() {
        let materialized = build(position, raw)?;
        match index.entry(materialized.record.id()) {
            Entry::Occupied(_) => {
                return Err(CodecError::DuplicateEntity {
                    kind: E::Id::KIND,
                    id: materialized.record.id().value(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(materialized);
            }
        }
    }
    Ok(index)
}

/// Resolves every placeholder against the id index of the other kind.
fn patch<E, P>(
    pending: BTreeMap<E::Id, Materialized<E>>,
    partners: &BTreeMap<E::PartnerId, P>,
) -> CodecResult<BTreeMap<E::Id, E>>
where
    E: Linked,
{
    let mut resolved = BTreeMap::new();
    for (id, materialized) in pending {
        let Materialized {
            mut record,
            placeholders,
        } = materialized;
        for placeholder in placeholders {
            if !partners.contains_key(&placeholder.id) {
                return Err(CodecError::DanglingReference {
                    kind: E::Id::KIND,
                    id: id.value(),
                    missing_kind: E::PartnerId::KIND,
                    missing_id: placeholder.id.value(),
                });
            }
            record.partners_mut().insert(placeholder.id);
        }
        resolved.insert(id, record);
    }
    Ok(resolved)
}

fn materialize_person(index: usize, raw: &FlatPerson) -> CodecResult<Materialized<Person>> {
    let kind = EntityKind::Person;
    let id = StudentId::from_raw(parse_id(kind, index, "userId", raw.user_id)?);
    let name = parse_field(kind, index, "name", raw.name.as_deref(), Name::parse)?;
    let phone = parse_field(kind, index, "phone", raw.phone.as_deref(), Phone::parse)?;
    let email = parse_field(kind, index, "email", raw.email.as_deref(), Email::parse)?;
    let note = Note::new(required(kind, index, "note", raw.note.as_deref())?);
    let tags = raw
        .tags
        .iter()
        .flatten()
        .map(|tag| Tag::parse(tag.as_str()).map_err(|err| invalid(kind, index, "tags", &err)))
        .collect::<CodecResult<Vec<_>>>()?;
    let placeholders = parse_id_list(kind, index, "lessonIds", raw.lesson_ids.as_deref())?;

    Ok(Materialized {
        record: Person::new(id, name, phone, email, note, tags),
        placeholders,
    })
}

fn materialize_lesson(index: usize, raw: &FlatLesson) -> CodecResult<Materialized<Lesson>> {
    let kind = EntityKind::Lesson;
    let id = LessonId::from_raw(parse_id(kind, index, "lessonId", raw.lesson_id)?);
    let day = parse_field(kind, index, "day", raw.day.as_deref(), Day::parse)?;
    let start_time = parse_field(kind, index, "startTime", raw.start_time.as_deref(), Time::parse)?;
    let end_time = parse_field(kind, index, "endTime", raw.end_time.as_deref(), Time::parse)?;
    let venue = Venue::new(required(kind, index, "venue", raw.venue.as_deref())?);
    let note = Note::new(required(kind, index, "note", raw.note.as_deref())?);
    let placeholders = parse_id_list(kind, index, "studentIds", raw.student_ids.as_deref())?;

    let record = Lesson::new(id, day, start_time, end_time, venue, note)
        .map_err(|err| invalid(kind, index, "endTime", &err))?;
    Ok(Materialized {
        record,
        placeholders,
    })
}

fn required<'a>(
    kind: EntityKind,
    index: usize,
    field: &'static str,
    value: Option<&'a str>,
) -> CodecResult<&'a str> {
    value.ok_or_else(|| CodecError::InvalidField {
        kind,
        index,
        field,
        reason: "is missing or null".to_string(),
    })
}

fn parse_field<'a, T>(
    kind: EntityKind,
    index: usize,
    field: &'static str,
    value: Option<&'a str>,
    parse: impl FnOnce(&'a str) -> Result<T, FieldError>,
) -> CodecResult<T> {
    let raw = required(kind, index, field, value)?;
    parse(raw).map_err(|err| invalid(kind, index, field, &err))
}

fn parse_id(kind: EntityKind, index: usize, field: &'static str, value: Option<i64>) -> CodecResult<u32> {
    let raw = value.ok_or_else(|| CodecError::InvalidField {
        kind,
        index,
        field,
        reason: "is missing or null".to_string(),
    })?;
    u32::try_from(raw).map_err(|_| CodecError::InvalidField {
        kind,
        index,
        field,
        reason: format!("has out-of-range id {raw}"),
    })
}

fn parse_id_list<I: EntityId>(
    kind: EntityKind,
    index: usize,
    field: &'static str,
    values: Option<&[i64]>,
) -> CodecResult<Vec<Placeholder<I>>> {
    values
        .unwrap_or_default()
        .iter()
        .map(|raw| {
            let id = parse_id(kind, index, field, Some(*raw))?;
            Ok(Placeholder {
                id: I::from_raw(id),
            })
        })
        .collect()
}

fn invalid(kind: EntityKind, index: usize, field: &'static str, err: &FieldError) -> CodecError {
    CodecError::InvalidField {
        kind,
        index,
        field,
        reason: err.to_string(),
    }
}

fn allocator_after<I: EntityId>(max_id: Option<I>) -> IdAllocator<I> {
    max_id.map_or_else(IdAllocator::fresh, IdAllocator::after)
}

#[cfg(test)]
mod tests {
    use super::{allocator_after, decode, encode, CodecError};
    use crate::model::id::{EntityKind, IdError, LessonId, StudentId};
    use crate::storage::flat::{FlatLesson, FlatPerson, FlatSnapshot};

    fn person(id: i64, lessons: Vec<i64>) -> FlatPerson {
        FlatPerson {
            user_id: Some(id),
            name: Some(format!("Student {id}")),
            phone: Some("91234567".to_string()),
            email: Some("student@example.com".to_string()),
            note: Some(String::new()),
            tags: None,
            lesson_ids: Some(lessons),
        }
    }

    fn lesson(id: i64, students: Vec<i64>) -> FlatLesson {
        FlatLesson {
            lesson_id: Some(id),
            day: Some("mon".to_string()),
            start_time: Some("0900".to_string()),
            end_time: Some("1000".to_string()),
            venue: Some("Room 1".to_string()),
            note: Some(String::new()),
            student_ids: Some(students),
        }
    }

    #[test]
    fn allocator_starts_at_zero_for_empty_kind() {
        assert_eq!(
            allocator_after::<StudentId>(None).peek(),
            Some(StudentId::new(0))
        );
        assert_eq!(
            allocator_after(Some(StudentId::new(9))).peek(),
            Some(StudentId::new(10))
        );
    }

    #[test]
    fn largest_id_survives_a_round_trip() {
        let snapshot = FlatSnapshot {
            persons: vec![person(i64::from(u32::MAX), vec![3])],
            lessons: vec![lesson(3, vec![i64::from(u32::MAX)])],
        };
        let first = decode(&snapshot).unwrap();
        let decoded = decode(&encode(&first.store)).unwrap();
        assert_eq!(
            encode(&decoded.store).persons[0].user_id,
            Some(i64::from(u32::MAX))
        );

        let mut student_ids = decoded.student_ids;
        assert!(student_ids.is_seeded());
        assert_eq!(student_ids.peek(), None);
        assert_eq!(
            student_ids.next().unwrap_err(),
            IdError::Exhausted(EntityKind::Person)
        );
        assert_eq!(decoded.lesson_ids.peek(), Some(LessonId::new(4)));
    }

    #[test]
    fn decode_links_both_sides() {
        let snapshot = FlatSnapshot {
            persons: vec![person(1, vec![10])],
            lessons: vec![lesson(10, vec![1])],
        };
        let decoded = decode(&snapshot).unwrap();
        assert!(decoded.store.check_consistency().is_ok());
        assert_eq!(encode(&decoded.store).persons[0].lesson_ids, Some(vec![10]));
    }

    #[test]
    fn decode_reports_reversed_lesson_window_on_end_time() {
        let mut reversed = lesson(10, vec![]);
        reversed.end_time = Some("0800".to_string());
        let err = decode(&FlatSnapshot {
            persons: vec![],
            lessons: vec![reversed],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidField {
                kind: EntityKind::Lesson,
                field: "endTime",
                ..
            }
        ));
    }

    #[test]
    fn negative_relationship_id_is_invalid_field() {
        let err = decode(&FlatSnapshot {
            persons: vec![person(1, vec![-4])],
            lessons: vec![],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidField {
                field: "lessonIds",
                index: 0,
                ..
            }
        ));
    }
}

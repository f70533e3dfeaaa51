use lessonbook_core::storage::{decode, encode};
use lessonbook_core::{
    CodecError, EntityKind, FlatSnapshot, LessonBook, LessonId, StudentId,
};
use serde_json::{json, Value};

fn snapshot(value: Value) -> FlatSnapshot {
    serde_json::from_value(value).unwrap()
}

fn alice(lesson_ids: Value) -> Value {
    json!({
        "userId": 1, "name": "Alice Pauline", "phone": "94351253",
        "email": "alice@example.com", "note": "", "tags": ["friends"],
        "lessonIds": lesson_ids
    })
}

fn lesson_ten(student_ids: Value) -> Value {
    json!({
        "lessonId": 10, "day": "MON", "startTime": "0900", "endTime": "1030",
        "venue": "Block 52", "note": "", "studentIds": student_ids
    })
}

#[test]
fn encoded_records_list_partner_ids_and_decode_relinks_them() {
    let flat = snapshot(json!({
        "persons": [alice(json!([10]))],
        "lessons": [lesson_ten(json!([1]))]
    }));

    let decoded = decode(&flat).unwrap();
    let person = decoded.store.get_person(StudentId::new(1)).unwrap();
    let lesson = decoded.store.get_lesson(LessonId::new(10)).unwrap();
    assert!(person.has_lesson(LessonId::new(10)));
    assert!(lesson.has_student(StudentId::new(1)));
    assert_eq!(decoded.store.lessons_of(StudentId::new(1))[0].venue.as_str(), "Block 52");

    let encoded = serde_json::to_value(encode(&decoded.store)).unwrap();
    assert_eq!(encoded["persons"][0]["lessonIds"], json!([10]));
    assert_eq!(encoded["lessons"][0]["studentIds"], json!([1]));
    assert_eq!(encoded["lessons"][0]["day"], json!("MON"));
}

#[test]
fn encode_then_decode_preserves_the_book() {
    let book = LessonBook::from_snapshot(&lessonbook_core::storage::sample::sample_snapshot()).unwrap();
    let reloaded = LessonBook::from_snapshot(&book.snapshot()).unwrap();

    assert_eq!(reloaded.store(), book.store());
    assert_eq!(reloaded.snapshot(), book.snapshot());
}

#[test]
fn dangling_lesson_reference_rejects_the_whole_load() {
    let flat = snapshot(json!({
        "persons": [alice(json!([10, 11]))],
        "lessons": [lesson_ten(json!([1]))]
    }));

    assert_eq!(
        decode(&flat).unwrap_err(),
        CodecError::DanglingReference {
            kind: EntityKind::Person,
            id: 1,
            missing_kind: EntityKind::Lesson,
            missing_id: 11
        }
    );
}

#[test]
fn dangling_student_reference_is_rejected() {
    let flat = snapshot(json!({
        "persons": [alice(json!([10]))],
        "lessons": [lesson_ten(json!([1, 7]))]
    }));

    assert!(matches!(
        decode(&flat).unwrap_err(),
        CodecError::DanglingReference {
            kind: EntityKind::Lesson,
            missing_id: 7,
            ..
        }
    ));
}

#[test]
fn edge_listed_on_one_side_only_is_rejected() {
    let flat = snapshot(json!({
        "persons": [alice(json!([10]))],
        "lessons": [lesson_ten(json!([]))]
    }));

    match decode(&flat).unwrap_err() {
        CodecError::AsymmetricEdge(edge) => {
            assert_eq!(edge.student_id, StudentId::new(1));
            assert_eq!(edge.lesson_id, LessonId::new(10));
            assert_eq!(edge.listed_by, EntityKind::Person);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_ids_are_rejected() {
    let flat = snapshot(json!({
        "persons": [alice(json!([])), alice(json!([]))],
        "lessons": []
    }));

    assert_eq!(
        decode(&flat).unwrap_err(),
        CodecError::DuplicateEntity {
            kind: EntityKind::Person,
            id: 1
        }
    );
}

#[test]
fn null_or_invalid_scalars_name_the_wire_field() {
    let cases = [
        (json!({ "persons": [{ "userId": 1, "name": null }] }), "name"),
        (json!({ "persons": [{ "name": "Bob" }] }), "userId"),
        (
            json!({ "persons": [{
                "userId": 1, "name": "Bob", "phone": "12", "email": "bob@example.com", "note": ""
            }] }),
            "phone",
        ),
        (
            json!({ "persons": [{
                "userId": 1, "name": "Bob", "phone": "123", "email": "bob@example.com",
                "note": "", "tags": ["not valid"]
            }] }),
            "tags",
        ),
        (
            json!({ "lessons": [{
                "lessonId": 2, "day": "FUNDAY", "startTime": "0900", "endTime": "1000",
                "venue": "Lab", "note": ""
            }] }),
            "day",
        ),
        (
            json!({ "lessons": [{
                "lessonId": 2, "day": "tue", "startTime": "2400", "endTime": "1000",
                "venue": "Lab", "note": ""
            }] }),
            "startTime",
        ),
        (
            json!({ "lessons": [{
                "lessonId": 2, "day": "tue", "startTime": "0900", "endTime": "1000", "note": ""
            }] }),
            "venue",
        ),
    ];

    for (value, expected_field) in cases {
        match decode(&snapshot(value)).unwrap_err() {
            CodecError::InvalidField { field, .. } => assert_eq!(field, expected_field),
            other => panic!("expected InvalidField({expected_field}), got {other}"),
        }
    }
}

#[test]
fn missing_relationship_lists_default_to_empty() {
    let flat = snapshot(json!({
        "persons": [{
            "userId": 4, "name": "Bob", "phone": "123", "email": "bob@example.com", "note": ""
        }]
    }));

    let decoded = decode(&flat).unwrap();
    let person = decoded.store.get_person(StudentId::new(4)).unwrap();
    assert!(person.lessons().is_empty());
    assert!(person.tags.is_empty());
}

#[test]
fn allocators_are_seeded_past_the_highest_loaded_id() {
    let flat = snapshot(json!({
        "persons": [alice(json!([10]))],
        "lessons": [lesson_ten(json!([1]))]
    }));

    let mut decoded = decode(&flat).unwrap();
    assert_eq!(decoded.student_ids.next().unwrap(), StudentId::new(2));
    assert_eq!(decoded.lesson_ids.next().unwrap(), LessonId::new(11));
}

#[test]
fn empty_snapshot_seeds_both_allocators_at_zero() {
    let mut decoded = decode(&FlatSnapshot::default()).unwrap();
    assert_eq!(decoded.student_ids.next().unwrap(), StudentId::new(0));
    assert_eq!(decoded.lesson_ids.next().unwrap(), LessonId::new(0));
}

#[test]
fn decoding_twice_seeds_identically() {
    let flat = snapshot(json!({
        "persons": [alice(json!([10]))],
        "lessons": [lesson_ten(json!([1]))]
    }));

    let first = decode(&flat).unwrap();
    let second = decode(&flat).unwrap();
    assert_eq!(first.student_ids, second.student_ids);
    assert_eq!(first.lesson_ids, second.lesson_ids);
}

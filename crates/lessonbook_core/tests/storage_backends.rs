use lessonbook_core::storage::sample::sample_snapshot;
use lessonbook_core::{
    load_book, load_book_or_sample, save_book, CodecError, CoreConfig, JsonFileStorage, LessonBook, LessonId,
    SnapshotStorage, SqliteSnapshotStorage, StorageBackend, StorageError, StudentId,
};
use serde_json::json;

fn sample_book() -> LessonBook {
    LessonBook::from_snapshot(&sample_snapshot()).unwrap()
}

#[test]
fn json_file_round_trips_a_linked_book() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = JsonFileStorage::new(dir.path().join("lessonbook.json"));
    let book = sample_book();

    save_book(&mut storage, &book).unwrap();
    let loaded = load_book(&storage).unwrap();

    assert_eq!(loaded.store(), book.store());
    assert!(loaded
        .store()
        .get_lesson(LessonId::new(2))
        .unwrap()
        .has_student(StudentId::new(1)));
}

#[test]
fn json_file_uses_the_camel_case_wire_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lessonbook.json");
    let mut storage = JsonFileStorage::new(&path);
    save_book(&mut storage, &sample_book()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["persons"][0]["userId"], json!(0));
    assert_eq!(raw["persons"][0]["lessonIds"], json!([2]));
    assert_eq!(raw["lessons"][2]["studentIds"], json!([0, 1]));
}

#[test]
fn missing_file_loads_an_empty_book_seeded_at_zero() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonFileStorage::new(dir.path().join("never-saved.json"));

    let book = load_book(&storage).unwrap();

    assert!(book.store().persons().is_empty());
    assert_eq!(book.next_student_id(), Some(StudentId::new(0)));
    assert_eq!(book.next_lesson_id(), Some(LessonId::new(0)));
}

#[test]
fn corrupt_file_surfaces_the_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lessonbook.json");
    std::fs::write(
        &path,
        json!({ "persons": [{ "userId": 1, "name": "Amy", "phone": "123",
            "email": "amy@example.com", "note": "", "lessonIds": [9] }] })
        .to_string(),
    )
    .unwrap();

    let err = load_book(&JsonFileStorage::new(&path)).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Codec(CodecError::DanglingReference { missing_id: 9, .. })
    ));
}

#[test]
fn sqlite_file_round_trips_a_linked_book() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lessonbook.db");
    let book = sample_book();

    {
        let mut storage = SqliteSnapshotStorage::open(&path).unwrap();
        save_book(&mut storage, &book).unwrap();
    }

    let storage = SqliteSnapshotStorage::open(&path).unwrap();
    let loaded = load_book(&storage).unwrap();
    assert_eq!(loaded.snapshot(), book.snapshot());
    assert_eq!(loaded.next_student_id(), Some(StudentId::new(6)));
}

#[test]
fn sqlite_backend_without_snapshot_loads_empty_book() {
    let storage = SqliteSnapshotStorage::open_in_memory().unwrap();
    assert!(storage.read_snapshot().unwrap().is_none());
    assert!(load_book(&storage).unwrap().store().lessons().is_empty());
}

#[test]
fn configured_backend_round_trips_through_trait_object() {
    let dir = tempfile::tempdir().unwrap();
    for (backend, file) in [
        (StorageBackend::Json, "book.json"),
        (StorageBackend::Sqlite, "book.db"),
    ] {
        let config = CoreConfig {
            data_file: dir.path().join(file),
            backend,
            ..CoreConfig::default()
        };
        let mut storage = config.open_storage().unwrap();
        save_book(storage.as_mut(), &sample_book()).unwrap();

        let loaded = load_book(storage.as_ref()).unwrap();
        assert_eq!(loaded.store().persons().len(), 6);
    }
}

#[test]
fn first_run_seeds_the_sample_book_but_keeps_a_saved_empty_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = JsonFileStorage::new(dir.path().join("lessonbook.json"));

    let seeded = load_book_or_sample(&storage).unwrap();
    assert_eq!(seeded.store(), sample_book().store());
    assert_eq!(seeded.next_student_id(), Some(StudentId::new(6)));

    save_book(&mut storage, &LessonBook::new()).unwrap();
    let reloaded = load_book_or_sample(&storage).unwrap();
    assert!(reloaded.store().persons().is_empty());
    assert!(reloaded.store().lessons().is_empty());
}

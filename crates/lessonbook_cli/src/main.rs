//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lessonbook_core` linkage from a standalone binary.
//! - Seed the sample book into an empty in-memory database, push it through
//!   encode, JSON and decode, and print a deterministic summary.

use lessonbook_core::{
    core_version, load_book_or_sample, FlatSnapshot, LessonBook, SqliteSnapshotStorage,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("lessonbook_core version={}", core_version());
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("lessonbook smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let book = load_book_or_sample(&SqliteSnapshotStorage::open_in_memory()?)?;
    let json = serde_json::to_string(&book.snapshot())?;
    let reloaded = LessonBook::from_snapshot(&serde_json::from_str::<FlatSnapshot>(&json)?)?;

    let store = reloaded.store();
    let edges: usize = store
        .persons()
        .iter()
        .map(|person| person.lessons().len())
        .sum();
    println!(
        "sample persons={} lessons={} edges={} consistent={}",
        store.persons().len(),
        store.lessons().len(),
        edges,
        store.check_consistency().is_ok()
    );
    println!(
        "next_ids student={} lesson={}",
        reloaded
            .next_student_id()
            .map_or_else(|| "-".to_string(), |id| id.to_string()),
        reloaded
            .next_lesson_id()
            .map_or_else(|| "-".to_string(), |id| id.to_string())
    );
    Ok(())
}

//! First-run sample book.
//!
//! Shipped as a flat snapshot so it goes through the same decoder as
//! persisted data.

use crate::storage::flat::{FlatLesson, FlatPerson, FlatSnapshot};

const SAMPLE_PERSONS: &[(i64, &str, &str, &str, &str, &[&str], &[i64])] = &[
    (0, "Alex Yeoh", "87438807", "alexyeoh@example.com", "Struggling with calculus, needs extra help", &["English"], &[2]),
    (1, "Bernice Yu", "99272758", "berniceyu@example.com", "Excellent progress in algebra", &["Mathematics", "Mandarin"], &[2]),
    (2, "Charlotte Oliveiro", "93210283", "charlotte@example.com", "Prefers evening classes", &["Mathematics"], &[0, 5]),
    (3, "David Li", "91031282", "lidavid@example.com", "Preparing for final exams", &["Biology"], &[]),
    (4, "Irfan Ibrahim", "92492021", "irfan@example.com", "Interested in advanced topics", &["Biology"], &[]),
    (5, "Roy Balakrishnan", "92624417", "royb@example.com", "Needs help with essay writing", &["Biology"], &[]),
];

const SAMPLE_LESSONS: &[(i64, &str, &str, &str, &str, &str, &[i64])] = &[
    (0, "MON", "1000", "1200", "COM1-B103", "Introduction to Programming", &[2]),
    (1, "TUE", "1400", "1600", "COM2-0204", "Data Structures and Algorithms", &[]),
    (2, "WED", "0900", "1100", "S16-0430", "Calculus I", &[0, 1]),
    (3, "THU", "1500", "1700", "LT19", "Software Engineering", &[]),
    (4, "FRI", "1300", "1500", "COM1-0217", "Database Systems", &[]),
    (5, "MON", "1600", "1800", "AS6-0426", "Physics for Computing", &[2]),
];

/// Six students and six lessons with a few enrollments.
pub fn sample_snapshot() -> FlatSnapshot {
    let persons = SAMPLE_PERSONS
        .iter()
        .map(|(id, name, phone, email, note, tags, lessons)| FlatPerson {
            user_id: Some(*id),
            name: Some((*name).to_string()),
            phone: Some((*phone).to_string()),
            email: Some((*email).to_string()),
            note: Some((*note).to_string()),
            tags: Some(tags.iter().map(|tag| (*tag).to_string()).collect()),
            lesson_ids: Some(lessons.to_vec()),
        })
        .collect();
    let lessons = SAMPLE_LESSONS
        .iter()
        .map(|(id, day, start, end, venue, note, students)| FlatLesson {
            lesson_id: Some(*id),
            day: Some((*day).to_string()),
            start_time: Some((*start).to_string()),
            end_time: Some((*end).to_string()),
            venue: Some((*venue).to_string()),
            note: Some((*note).to_string()),
            student_ids: Some(students.to_vec()),
        })
        .collect();
    FlatSnapshot { persons, lessons }
}

#[cfg(test)]
mod tests {
    use super::sample_snapshot;
    use crate::model::id::{LessonId, StudentId};
    use crate::storage::codec::decode;

    #[test]
    fn sample_decodes_into_a_consistent_book() {
        let decoded = decode(&sample_snapshot()).unwrap();
        assert_eq!(decoded.store.persons().len(), 6);
        assert_eq!(decoded.store.lessons().len(), 6);
        assert_eq!(decoded.student_ids.peek(), Some(StudentId::new(6)));
        assert_eq!(decoded.lesson_ids.peek(), Some(LessonId::new(6)));
        assert_eq!(decoded.store.students_of(LessonId::new(2)).len(), 2);
    }
}

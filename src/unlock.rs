//! Sequential lesson gating.
//!
//! The unlocked set is derived from the stored `completed` flags on every
//! read and never persisted.

use uuid::Uuid;

use crate::models::{CourseStructure, ProgressRecord};

/// Unlocked lessons in course order.
///
/// The first lesson is always open. Any later lesson opens when its
/// predecessor is completed, or when it is completed itself so learners can
/// go back and review.
pub fn unlocked_lessons(structure: &CourseStructure, record: &ProgressRecord) -> Vec<Uuid> {
    let mut unlocked = Vec::new();
    let mut previous_completed = true;
    for lesson in structure.lessons() {
        let completed = record.is_lesson_completed(lesson.id);
        if previous_completed || completed {
            unlocked.push(lesson.id);
        }
        previous_completed = completed;
    }
    unlocked
}

pub fn is_unlocked(structure: &CourseStructure, record: &ProgressRecord, lesson_id: Uuid) -> bool {
    unlocked_lessons(structure, record).contains(&lesson_id)
}

use crate::models::{CourseStructure, CourseSummary, ProgressRecord};
use crate::unlock::unlocked_lessons;

/// A course is complete when it has at least one lesson and every lesson is
/// completed. Courses without lessons can never be completed.
pub fn is_course_complete(structure: &CourseStructure, record: &ProgressRecord) -> bool {
    structure.lesson_count() > 0
        && structure
            .lessons()
            .all(|l| record.is_lesson_completed(l.id))
}

pub fn summarize(structure: &CourseStructure, record: &ProgressRecord) -> CourseSummary {
    let total = structure.lesson_count();
    let done = structure
        .lessons()
        .filter(|l| record.is_lesson_completed(l.id))
        .count();
    let percent = if total == 0 {
        0
    } else {
        ((done * 100) / total) as u8
    };
    let next_lesson = unlocked_lessons(structure, record)
        .into_iter()
        .find(|id| !record.is_lesson_completed(*id));

    CourseSummary {
        course_id: structure.course_id,
        total_lessons: total,
        completed_lessons: done,
        percent_complete: percent,
        complete: is_course_complete(structure, record),
        next_lesson,
    }
}

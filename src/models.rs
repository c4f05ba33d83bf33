use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;
use uuid::Uuid;

// --- course structure (read-only, owned by the catalog) ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub quiz_id: Option<Uuid>,
}

impl Lesson {
    pub fn has_quiz(&self) -> bool {
        self.quiz_id.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Section {
    pub id: Uuid,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CourseStructure {
    pub course_id: Uuid,
    pub sections: Vec<Section>,
}

impl CourseStructure {
    /// Lessons in canonical gating order: sections in order, then lessons
    /// in order within each section.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> + '_ {
        self.sections.iter().flat_map(|s| s.lessons.iter())
    }

    pub fn lesson(&self, lesson_id: Uuid) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == lesson_id)
    }

    pub fn lesson_count(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_index: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Quiz {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub questions: Vec<Question>,
}

// --- per-learner progress ---

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub lesson_id: Uuid,
    /// High-water mark of the playhead. Never decreases.
    pub max_watched_seconds: f64,
    /// Last reported playhead, only used to resume playback.
    pub resume_position_seconds: f64,
    pub video_duration_seconds: f64,
    pub video_completed: bool,
    pub quiz_answers: Option<Vec<i32>>,
    pub quiz_passed: bool,
    pub completed: bool,
    pub last_watched_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub user_id: String,
    pub course_id: Uuid,
    pub lessons: BTreeMap<Uuid, LessonProgress>,
}

impl ProgressRecord {
    pub fn empty(user_id: &str, course_id: Uuid) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id,
            lessons: BTreeMap::new(),
        }
    }

    pub fn lesson(&self, lesson_id: Uuid) -> Option<&LessonProgress> {
        self.lessons.get(&lesson_id)
    }

    pub fn is_lesson_completed(&self, lesson_id: Uuid) -> bool {
        self.lesson(lesson_id).is_some_and(|p| p.completed)
    }
}

/// Identifies one persisted `LessonProgress`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonKey {
    pub user_id: String,
    pub course_id: Uuid,
    pub lesson_id: Uuid,
}

impl LessonKey {
    pub fn new(user_id: &str, course_id: Uuid, lesson_id: Uuid) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id,
            lesson_id,
        }
    }
}

// --- certificates ---

#[skip_serializing_none]
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: String,
    pub course_id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    /// Instructor display name as it was at issuance time.
    pub instructor_name: Option<String>,
    pub artifact_file_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CertificateVerification {
    pub valid: bool,
    pub certificate: Option<Certificate>,
    pub message: String,
}

// --- request / response bodies ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlaybackReport {
    pub current_time: f64,
    pub duration: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizSubmission {
    pub answers: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    pub success: bool,
    pub message: String,
    pub wrong_question_indices: Vec<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UnlockedLessons {
    /// Unlocked lesson ids in course order.
    pub lessons: Vec<Uuid>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CourseSummary {
    pub course_id: Uuid,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub percent_complete: u8,
    pub complete: bool,
    /// First unlocked lesson that is not yet completed.
    pub next_lesson: Option<Uuid>,
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Certificate, LessonKey, LessonProgress, ProgressRecord};
use crate::tracker::{PlaybackPolicy, PlaybackSample};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence for per-learner progress and certificates.
///
/// Every mutating method is a single atomic read-modify-write against the
/// stored row. Implementations must never overwrite a lesson from a stale
/// read.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load_record(&self, user_id: &str, course_id: Uuid) -> Result<ProgressRecord>;

    /// Merge a playback sample: max for the high-water mark, latest value for
    /// resume position and duration, one-way video latch.
    async fn record_playback(
        &self,
        key: &LessonKey,
        sample: &PlaybackSample,
        policy: PlaybackPolicy,
    ) -> Result<LessonProgress>;

    /// Overwrite the quiz fields and recompute `completed`. Video fields are
    /// left untouched.
    async fn record_quiz_result(
        &self,
        key: &LessonKey,
        answers: &[i32],
        passed: bool,
    ) -> Result<LessonProgress>;

    async fn find_certificate(&self, user_id: &str, course_id: Uuid)
        -> Result<Option<Certificate>>;

    /// Insert `candidate` unless a certificate for the same (user, course)
    /// exists. Returns the stored certificate and whether it was created.
    async fn find_or_create_certificate(&self, candidate: Certificate)
        -> Result<(Certificate, bool)>;

    async fn certificate_by_code(&self, code: &str) -> Result<Option<Certificate>>;

    async fn certificates_for_user(&self, user_id: &str) -> Result<Vec<Certificate>>;
}

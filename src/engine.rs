use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{CourseCatalog, EnrollmentDirectory};
use crate::certificate;
use crate::completion;
use crate::config::EngineSettings;
use crate::error::{EngineError, Result};
use crate::models::{
    Certificate, CertificateVerification, CourseStructure, CourseSummary, Lesson, LessonKey,
    LessonProgress, ProgressRecord, QuizOutcome,
};
use crate::quiz;
use crate::render::CertificateRenderer;
use crate::store::ProgressStore;
use crate::tracker::{PlaybackPolicy, PlaybackSample};
use crate::unlock;

/// Certificate attempts before giving up on code collisions.
const ISSUE_ATTEMPTS: usize = 2;

/// Entry point for every progression operation. Cheap to clone.
#[derive(Clone)]
pub struct ProgressionEngine {
    store: Arc<dyn ProgressStore>,
    catalog: Arc<dyn CourseCatalog>,
    enrollment: Arc<dyn EnrollmentDirectory>,
    renderer: Arc<dyn CertificateRenderer>,
    settings: EngineSettings,
}

impl ProgressionEngine {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        catalog: Arc<dyn CourseCatalog>,
        enrollment: Arc<dyn EnrollmentDirectory>,
        renderer: Arc<dyn CertificateRenderer>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            enrollment,
            renderer,
            settings,
        }
    }

    async fn structure(&self, course_id: Uuid) -> Result<CourseStructure> {
        self.catalog
            .course_structure(course_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("course {course_id} not found")))
    }

    fn lesson<'a>(structure: &'a CourseStructure, lesson_id: Uuid) -> Result<&'a Lesson> {
        structure
            .lesson(lesson_id)
            .ok_or_else(|| EngineError::not_found(format!("lesson {lesson_id} not found")))
    }

    fn require_unlocked(
        structure: &CourseStructure,
        record: &ProgressRecord,
        lesson_id: Uuid,
    ) -> Result<()> {
        if unlock::is_unlocked(structure, record, lesson_id) {
            return Ok(());
        }
        warn!(user_id = %record.user_id, course_id = %record.course_id, %lesson_id, "locked lesson access rejected");
        Err(EngineError::forbidden("lesson is locked"))
    }

    pub async fn get_progress(&self, user_id: &str, course_id: Uuid) -> Result<ProgressRecord> {
        self.structure(course_id).await?;
        self.store.load_record(user_id, course_id).await
    }

    /// Ingest one playback ping for a lesson.
    pub async fn report_playback(
        &self,
        user_id: &str,
        course_id: Uuid,
        lesson_id: Uuid,
        current_time: f64,
        duration: f64,
    ) -> Result<LessonProgress> {
        let sample = PlaybackSample::new(current_time, duration)?;
        let structure = self.structure(course_id).await?;
        let lesson = Self::lesson(&structure, lesson_id)?;
        let record = self.store.load_record(user_id, course_id).await?;
        Self::require_unlocked(&structure, &record, lesson_id)?;

        let was_completed = record.lesson(lesson_id).is_some_and(|p| p.video_completed);
        let policy = PlaybackPolicy {
            completion_threshold: self.settings.completion_threshold,
            quiz_required: lesson.has_quiz(),
        };
        let key = LessonKey::new(user_id, course_id, lesson_id);
        let progress = self.store.record_playback(&key, &sample, policy).await?;

        debug!(
            %user_id, %course_id, %lesson_id,
            current_time, duration,
            max_watched = progress.max_watched_seconds,
            "playback recorded"
        );
        if progress.video_completed && !was_completed {
            info!(%user_id, %course_id, %lesson_id, completed = progress.completed, "video watch completed");
        }
        Ok(progress)
    }

    /// Grade a quiz submission and store the result. Retries are unlimited and
    /// the last grading wins.
    pub async fn submit_quiz(
        &self,
        user_id: &str,
        course_id: Uuid,
        lesson_id: Uuid,
        quiz_id: Uuid,
        answers: &[i32],
    ) -> Result<QuizOutcome> {
        let structure = self.structure(course_id).await?;
        let lesson = Self::lesson(&structure, lesson_id)?;
        if lesson.quiz_id != Some(quiz_id) {
            return Err(EngineError::not_found(format!(
                "quiz {quiz_id} not found for lesson {lesson_id}"
            )));
        }
        let quiz = self
            .catalog
            .quiz(quiz_id)
            .await?
            .filter(|q| q.lesson_id == lesson_id)
            .ok_or_else(|| EngineError::not_found(format!("quiz {quiz_id} not found")))?;

        let outcome = quiz::grade(&quiz, answers)?;

        let record = self.store.load_record(user_id, course_id).await?;
        Self::require_unlocked(&structure, &record, lesson_id)?;
        if !record.lesson(lesson_id).is_some_and(|p| p.video_completed) {
            return Err(EngineError::forbidden("video not completed"));
        }

        let key = LessonKey::new(user_id, course_id, lesson_id);
        let progress = self
            .store
            .record_quiz_result(&key, answers, outcome.success)
            .await?;

        info!(
            %user_id, %course_id, %lesson_id, %quiz_id,
            success = outcome.success,
            wrong = outcome.wrong_question_indices.len(),
            completed = progress.completed,
            "quiz graded"
        );
        Ok(outcome)
    }

    pub async fn unlocked_lessons(&self, user_id: &str, course_id: Uuid) -> Result<Vec<Uuid>> {
        let structure = self.structure(course_id).await?;
        let record = self.store.load_record(user_id, course_id).await?;
        Ok(unlock::unlocked_lessons(&structure, &record))
    }

    pub async fn ensure_lesson_access(
        &self,
        user_id: &str,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<()> {
        let structure = self.structure(course_id).await?;
        Self::lesson(&structure, lesson_id)?;
        let record = self.store.load_record(user_id, course_id).await?;
        Self::require_unlocked(&structure, &record, lesson_id)
    }

    pub async fn is_course_complete(&self, user_id: &str, course_id: Uuid) -> Result<bool> {
        let structure = self.structure(course_id).await?;
        let record = self.store.load_record(user_id, course_id).await?;
        Ok(completion::is_course_complete(&structure, &record))
    }

    pub async fn course_summary(&self, user_id: &str, course_id: Uuid) -> Result<CourseSummary> {
        let structure = self.structure(course_id).await?;
        let record = self.store.load_record(user_id, course_id).await?;
        Ok(completion::summarize(&structure, &record))
    }

    /// Issue the course certificate, or hand back the one already issued.
    ///
    /// Returns the certificate and whether this call created it. Concurrent
    /// first-time calls converge on a single stored certificate.
    pub async fn issue_certificate(
        &self,
        user_id: &str,
        course_id: Uuid,
    ) -> Result<(Certificate, bool)> {
        let structure = self.structure(course_id).await?;
        if !self.enrollment.is_enrolled(user_id, course_id).await? {
            return Err(EngineError::forbidden("not enrolled"));
        }
        // An issued certificate outlives later quiz retries.
        if let Some(existing) = self.store.find_certificate(user_id, course_id).await? {
            debug!(%user_id, %course_id, code = %existing.code, "certificate already issued");
            return Ok((existing, false));
        }

        let record = self.store.load_record(user_id, course_id).await?;
        if !completion::is_course_complete(&structure, &record) {
            return Err(EngineError::forbidden("course not completed"));
        }

        let instructor_name = self.catalog.instructor_name(course_id).await?;
        for _ in 0..ISSUE_ATTEMPTS {
            let mut candidate = certificate::draft(
                user_id,
                course_id,
                instructor_name.clone(),
                &self.settings.certificate_code_prefix,
                Utc::now(),
            );
            candidate.artifact_file_id = Some(self.renderer.render(&candidate).await?);

            match self.store.find_or_create_certificate(candidate).await {
                Ok((cert, created)) => {
                    if created {
                        info!(%user_id, %course_id, code = %cert.code, "certificate issued");
                    } else {
                        debug!(%user_id, %course_id, code = %cert.code, "certificate issued concurrently");
                    }
                    return Ok((cert, created));
                }
                Err(EngineError::Conflict(msg)) => {
                    warn!(%user_id, %course_id, reason = %msg, "certificate insert conflicted");
                    if let Some(existing) = self.store.find_certificate(user_id, course_id).await? {
                        return Ok((existing, false));
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(EngineError::Conflict(
            "could not allocate a unique certificate code".into(),
        ))
    }

    pub async fn verify_certificate(&self, code: &str) -> Result<CertificateVerification> {
        let found = self.store.certificate_by_code(code).await?;
        Ok(certificate::verification(found))
    }

    pub async fn certificates_for_user(&self, user_id: &str) -> Result<Vec<Certificate>> {
        self.store.certificates_for_user(user_id).await
    }
}

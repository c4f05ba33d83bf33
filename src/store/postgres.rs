use async_trait::async_trait;
use sqlx::{query_as, PgPool};
use uuid::Uuid;

use super::ProgressStore;
use crate::error::{EngineError, Result};
use crate::models::{Certificate, LessonKey, LessonProgress, ProgressRecord};
use crate::tracker::{PlaybackPolicy, PlaybackSample};

const PROGRESS_COLUMNS: &str = "lesson_id, max_watched_seconds, resume_position_seconds, \
     video_duration_seconds, video_completed, quiz_answers, quiz_passed, completed, last_watched_at";

const CERTIFICATE_COLUMNS: &str =
    "id, user_id, course_id, code, issued_at, instructor_name, artifact_file_id";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn load_record(&self, user_id: &str, course_id: Uuid) -> Result<ProgressRecord> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress WHERE user_id = $1 AND course_id = $2"
        );
        let rows: Vec<LessonProgress> = query_as(&sql)
            .bind(user_id)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;

        let mut record = ProgressRecord::empty(user_id, course_id);
        record
            .lessons
            .extend(rows.into_iter().map(|p| (p.lesson_id, p)));
        Ok(record)
    }

    async fn record_playback(
        &self,
        key: &LessonKey,
        sample: &PlaybackSample,
        policy: PlaybackPolicy,
    ) -> Result<LessonProgress> {
        // The merge runs inside the upsert's row lock; `lp.*` is the stored
        // row, EXCLUDED is this sample.
        let sql = format!(
            r#"
            INSERT INTO lesson_progress AS lp (
                user_id, course_id, lesson_id,
                max_watched_seconds, resume_position_seconds, video_duration_seconds,
                video_completed, quiz_passed, completed, last_watched_at
            )
            VALUES (
                $1, $2, $3,
                $4::float8, $4::float8, $5::float8,
                $4::float8 / $5::float8 >= $6::float8,
                $7,
                ($4::float8 / $5::float8 >= $6::float8) AND $7,
                now()
            )
            ON CONFLICT (user_id, course_id, lesson_id) DO UPDATE SET
                max_watched_seconds = GREATEST(lp.max_watched_seconds, EXCLUDED.max_watched_seconds),
                resume_position_seconds = EXCLUDED.resume_position_seconds,
                video_duration_seconds = EXCLUDED.video_duration_seconds,
                video_completed = lp.video_completed
                    OR GREATEST(lp.max_watched_seconds, EXCLUDED.max_watched_seconds)
                        / EXCLUDED.video_duration_seconds >= $6::float8,
                completed = (
                    lp.video_completed
                    OR GREATEST(lp.max_watched_seconds, EXCLUDED.max_watched_seconds)
                        / EXCLUDED.video_duration_seconds >= $6::float8
                ) AND lp.quiz_passed,
                last_watched_at = EXCLUDED.last_watched_at
            RETURNING {PROGRESS_COLUMNS}
            "#
        );
        let progress: LessonProgress = query_as(&sql)
            .bind(&key.user_id)
            .bind(key.course_id)
            .bind(key.lesson_id)
            .bind(sample.current_time())
            .bind(sample.duration())
            .bind(policy.completion_threshold)
            .bind(!policy.quiz_required)
            .fetch_one(&self.pool)
            .await?;
        Ok(progress)
    }

    async fn record_quiz_result(
        &self,
        key: &LessonKey,
        answers: &[i32],
        passed: bool,
    ) -> Result<LessonProgress> {
        let sql = format!(
            r#"
            INSERT INTO lesson_progress AS lp (
                user_id, course_id, lesson_id, quiz_answers, quiz_passed, completed, last_watched_at
            )
            VALUES ($1, $2, $3, $4, $5, false, now())
            ON CONFLICT (user_id, course_id, lesson_id) DO UPDATE SET
                quiz_answers = EXCLUDED.quiz_answers,
                quiz_passed = EXCLUDED.quiz_passed,
                completed = lp.video_completed AND EXCLUDED.quiz_passed
            RETURNING {PROGRESS_COLUMNS}
            "#
        );
        let progress: LessonProgress = query_as(&sql)
            .bind(&key.user_id)
            .bind(key.course_id)
            .bind(key.lesson_id)
            .bind(answers.to_vec())
            .bind(passed)
            .fetch_one(&self.pool)
            .await?;
        Ok(progress)
    }

    async fn find_certificate(
        &self,
        user_id: &str,
        course_id: Uuid,
    ) -> Result<Option<Certificate>> {
        let sql = format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE user_id = $1 AND course_id = $2"
        );
        Ok(query_as(&sql)
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_or_create_certificate(
        &self,
        candidate: Certificate,
    ) -> Result<(Certificate, bool)> {
        let sql = format!(
            r#"
            INSERT INTO certificates ({CERTIFICATE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING {CERTIFICATE_COLUMNS}
            "#
        );
        let inserted: Option<Certificate> = query_as(&sql)
            .bind(candidate.id)
            .bind(&candidate.user_id)
            .bind(candidate.course_id)
            .bind(&candidate.code)
            .bind(candidate.issued_at)
            .bind(&candidate.instructor_name)
            .bind(&candidate.artifact_file_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(cert) = inserted {
            return Ok((cert, true));
        }

        // lost the race; the winner's row is committed by now
        self.find_certificate(&candidate.user_id, candidate.course_id)
            .await?
            .map(|cert| (cert, false))
            .ok_or_else(|| {
                EngineError::Conflict(format!(
                    "certificate for course {} could not be created or found",
                    candidate.course_id
                ))
            })
    }

    async fn certificate_by_code(&self, code: &str) -> Result<Option<Certificate>> {
        let sql = format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE code = $1");
        Ok(query_as(&sql).bind(code).fetch_optional(&self.pool).await?)
    }

    async fn certificates_for_user(&self, user_id: &str) -> Result<Vec<Certificate>> {
        let sql = format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE user_id = $1 ORDER BY issued_at DESC"
        );
        Ok(query_as(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::draft;
    use crate::tracker::{apply_playback, fresh_progress, DEFAULT_COMPLETION_THRESHOLD};
    use chrono::Utc;
    use std::collections::HashSet;

    fn policy(quiz_required: bool) -> PlaybackPolicy {
        PlaybackPolicy {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            quiz_required,
        }
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "needs DATABASE_URL"]
    async fn upsert_merges_like_apply_playback(pool: PgPool) {
        let store = PgStore::new(pool);
        let key = LessonKey::new("u1", Uuid::new_v4(), Uuid::new_v4());
        let mut expected = fresh_progress(key.lesson_id, true, Utc::now());

        // rewinds, a latch crossing, then a longer re-encode
        let samples = [
            (30.0, 100.0),
            (12.0, 100.0),
            (91.0, 100.0),
            (5.0, 100.0),
            (40.0, 400.0),
        ];
        for (t, d) in samples {
            let sample = PlaybackSample::new(t, d).unwrap();
            apply_playback(&mut expected, &sample, DEFAULT_COMPLETION_THRESHOLD, Utc::now());
            let stored = store.record_playback(&key, &sample, policy(true)).await.unwrap();

            assert_eq!(stored.max_watched_seconds, expected.max_watched_seconds);
            assert_eq!(stored.resume_position_seconds, expected.resume_position_seconds);
            assert_eq!(stored.video_duration_seconds, expected.video_duration_seconds);
            assert_eq!(stored.video_completed, expected.video_completed);
            assert_eq!(stored.quiz_passed, expected.quiz_passed);
            assert_eq!(stored.completed, expected.completed);
        }

        let stored = store.record_quiz_result(&key, &[1, 0], true).await.unwrap();
        assert_eq!(stored.max_watched_seconds, 91.0);
        assert!(stored.video_completed);
        assert!(stored.completed);

        let stored = store.record_quiz_result(&key, &[0, 0], false).await.unwrap();
        assert_eq!(stored.quiz_answers, Some(vec![0, 0]));
        assert!(!stored.completed);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "needs DATABASE_URL"]
    async fn lesson_without_quiz_completes_on_first_insert(pool: PgPool) {
        let store = PgStore::new(pool);
        let key = LessonKey::new("u1", Uuid::new_v4(), Uuid::new_v4());
        let sample = PlaybackSample::new(100.0, 100.0).unwrap();

        let stored = store.record_playback(&key, &sample, policy(false)).await.unwrap();
        assert!(stored.quiz_passed);
        assert!(stored.completed);

        let record = store.load_record("u1", key.course_id).await.unwrap();
        assert_eq!(record.lesson(key.lesson_id), Some(&stored));
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_pings_keep_the_maximum(pool: PgPool) {
        let store = PgStore::new(pool);
        let key = LessonKey::new("u1", Uuid::new_v4(), Uuid::new_v4());

        let mut handles = Vec::new();
        for i in 0..64u32 {
            let store = store.clone();
            let key = key.clone();
            let t = if i % 2 == 0 { f64::from(i) } else { f64::from(64 - i) };
            handles.push(tokio::spawn(async move {
                let sample = PlaybackSample::new(t, 1000.0).unwrap();
                store.record_playback(&key, &sample, policy(false)).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let record = store.load_record("u1", key.course_id).await.unwrap();
        assert_eq!(record.lesson(key.lesson_id).unwrap().max_watched_seconds, 63.0);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_issuance_creates_one_certificate(pool: PgPool) {
        let store = PgStore::new(pool);
        let course_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let candidate = draft("u1", course_id, None, "CERT", Utc::now());
                store.find_or_create_certificate(candidate).await.unwrap()
            }));
        }
        let mut created = 0;
        let mut codes = HashSet::new();
        for h in handles {
            let (cert, was_created) = h.await.unwrap();
            created += usize::from(was_created);
            codes.insert(cert.code);
        }
        assert_eq!(created, 1);
        assert_eq!(codes.len(), 1);

        let code = codes.into_iter().next().unwrap();
        let found = store.certificate_by_code(&code).await.unwrap().unwrap();
        assert_eq!(found.course_id, course_id);
        assert_eq!(store.certificates_for_user("u1").await.unwrap().len(), 1);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "needs DATABASE_URL"]
    async fn duplicate_code_is_a_conflict(pool: PgPool) {
        let store = PgStore::new(pool);
        let first = draft("u1", Uuid::new_v4(), None, "CERT", Utc::now());
        let mut second = draft("u2", Uuid::new_v4(), None, "CERT", Utc::now());
        second.code = first.code.clone();

        store.find_or_create_certificate(first).await.unwrap();
        let err = store.find_or_create_certificate(second).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }
}

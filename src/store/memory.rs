use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::ProgressStore;
use crate::error::{EngineError, Result};
use crate::models::{Certificate, LessonKey, LessonProgress, ProgressRecord};
use crate::quiz::apply_quiz_result;
use crate::tracker::{apply_playback, fresh_progress, PlaybackPolicy, PlaybackSample};

type RecordKey = (String, Uuid);

/// In-process store. Each (user, course) record is mutated while its map
/// shard is write-locked, which makes every update atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<RecordKey, ProgressRecord>,
    certificates: DashMap<RecordKey, Certificate>,
    codes: DashMap<String, RecordKey>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lesson<F>(&self, key: &LessonKey, quiz_required: bool, f: F) -> LessonProgress
    where
        F: FnOnce(&mut LessonProgress),
    {
        let mut record = self
            .records
            .entry((key.user_id.clone(), key.course_id))
            .or_insert_with(|| ProgressRecord::empty(&key.user_id, key.course_id));
        let lesson = record
            .lessons
            .entry(key.lesson_id)
            .or_insert_with(|| fresh_progress(key.lesson_id, quiz_required, Utc::now()));
        f(lesson);
        lesson.clone()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load_record(&self, user_id: &str, course_id: Uuid) -> Result<ProgressRecord> {
        Ok(self
            .records
            .get(&(user_id.to_string(), course_id))
            .map(|r| r.clone())
            .unwrap_or_else(|| ProgressRecord::empty(user_id, course_id)))
    }

    async fn record_playback(
        &self,
        key: &LessonKey,
        sample: &PlaybackSample,
        policy: PlaybackPolicy,
    ) -> Result<LessonProgress> {
        Ok(self.with_lesson(key, policy.quiz_required, |lesson| {
            apply_playback(lesson, sample, policy.completion_threshold, Utc::now())
        }))
    }

    async fn record_quiz_result(
        &self,
        key: &LessonKey,
        answers: &[i32],
        passed: bool,
    ) -> Result<LessonProgress> {
        Ok(self.with_lesson(key, true, |lesson| {
            apply_quiz_result(lesson, answers, passed)
        }))
    }

    async fn find_certificate(
        &self,
        user_id: &str,
        course_id: Uuid,
    ) -> Result<Option<Certificate>> {
        Ok(self
            .certificates
            .get(&(user_id.to_string(), course_id))
            .map(|c| c.clone()))
    }

    async fn find_or_create_certificate(
        &self,
        candidate: Certificate,
    ) -> Result<(Certificate, bool)> {
        let key = (candidate.user_id.clone(), candidate.course_id);
        match self.certificates.entry(key.clone()) {
            Entry::Occupied(existing) => Ok((existing.get().clone(), false)),
            Entry::Vacant(slot) => {
                match self.codes.entry(candidate.code.clone()) {
                    Entry::Occupied(_) => {
                        return Err(EngineError::Conflict(format!(
                            "certificate code {} already exists",
                            candidate.code
                        )))
                    }
                    Entry::Vacant(code_slot) => {
                        code_slot.insert(key);
                    }
                }
                slot.insert(candidate.clone());
                Ok((candidate, true))
            }
        }
    }

    async fn certificate_by_code(&self, code: &str) -> Result<Option<Certificate>> {
        let key = match self.codes.get(code) {
            Some(k) => k.clone(),
            None => return Ok(None),
        };
        Ok(self.certificates.get(&key).map(|c| c.clone()))
    }

    async fn certificates_for_user(&self, user_id: &str) -> Result<Vec<Certificate>> {
        let mut certs: Vec<Certificate> = self
            .certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.clone())
            .collect();
        certs.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(certs)
    }
}

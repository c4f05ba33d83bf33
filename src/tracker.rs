//! Video watch tracking.
//!
//! Playback telemetry arrives in bursts, duplicated and out of order. The
//! merge rules here are what every store applies inside its atomic update:
//! the high-water mark only grows, the completion latch only closes, and the
//! resume position simply follows the latest report.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::LessonProgress;

pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.9;

/// A validated playback ping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSample {
    current_time: f64,
    duration: f64,
}

impl PlaybackSample {
    pub fn new(current_time: f64, duration: f64) -> Result<Self> {
        if !current_time.is_finite() || current_time < 0.0 {
            return Err(EngineError::validation(
                "current_time must be a non-negative number",
            ));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EngineError::validation("duration must be a positive number"));
        }
        Ok(Self {
            current_time,
            duration,
        })
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// Parameters a store needs to merge a sample into a lesson.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackPolicy {
    pub completion_threshold: f64,
    /// Lessons with a quiz start out with `quiz_passed = false`.
    pub quiz_required: bool,
}

/// Progress for a lesson that has never been written.
pub fn fresh_progress(lesson_id: Uuid, quiz_required: bool, now: DateTime<Utc>) -> LessonProgress {
    LessonProgress {
        lesson_id,
        max_watched_seconds: 0.0,
        resume_position_seconds: 0.0,
        video_duration_seconds: 0.0,
        video_completed: false,
        quiz_answers: None,
        quiz_passed: !quiz_required,
        completed: false,
        last_watched_at: now,
    }
}

pub fn watch_ratio(progress: &LessonProgress) -> f64 {
    if progress.video_duration_seconds <= 0.0 {
        return 0.0;
    }
    progress.max_watched_seconds / progress.video_duration_seconds
}

/// Merge one sample into `progress` in place.
pub fn apply_playback(
    progress: &mut LessonProgress,
    sample: &PlaybackSample,
    completion_threshold: f64,
    now: DateTime<Utc>,
) {
    progress.resume_position_seconds = sample.current_time();
    progress.max_watched_seconds = progress.max_watched_seconds.max(sample.current_time());
    progress.video_duration_seconds = sample.duration();
    if watch_ratio(progress) >= completion_threshold {
        progress.video_completed = true;
    }
    progress.completed = progress.video_completed && progress.quiz_passed;
    progress.last_watched_at = now;
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use course_progress::catalog::MemoryCatalog;
use course_progress::config::EngineSettings;
use course_progress::models::{Certificate, CourseStructure, Lesson, Question, Quiz, Section};
use course_progress::render::CertificateRenderer;
use course_progress::store::MemoryStore;
use course_progress::{ProgressionEngine, Result};

pub const LEARNER: &str = "learner-1";

/// Renderer that only counts calls and hands out predictable ids.
#[derive(Default)]
pub struct CountingRenderer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CertificateRenderer for CountingRenderer {
    async fn render(&self, certificate: &Certificate) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("certificates/{}.pdf", certificate.code))
    }
}

pub struct Fixture {
    pub engine: ProgressionEngine,
    pub catalog: Arc<MemoryCatalog>,
    pub renderer: Arc<CountingRenderer>,
    pub course_id: Uuid,
    pub lessons: Vec<Uuid>,
    /// Quiz id per lesson, same order as `lessons`.
    pub quizzes: Vec<Option<Uuid>>,
}

impl Fixture {
    pub fn renders(&self) -> usize {
        self.renderer.calls.load(Ordering::SeqCst)
    }
}

/// One course, one section per two lessons. `quiz_keys[i]` is the answer key
/// of lesson `i`'s quiz, or `None` for a lesson without a quiz. The learner is
/// enrolled.
pub fn course_fixture(quiz_keys: &[Option<Vec<i32>>]) -> Fixture {
    let catalog = Arc::new(MemoryCatalog::new());
    let course_id = Uuid::new_v4();

    let mut lessons = Vec::new();
    let mut quizzes = Vec::new();
    let mut all = Vec::new();
    for (i, key) in quiz_keys.iter().enumerate() {
        let lesson_id = Uuid::new_v4();
        let quiz_id = key.as_ref().map(|key| {
            let quiz = Quiz {
                id: Uuid::new_v4(),
                lesson_id,
                questions: key
                    .iter()
                    .map(|k| Question {
                        prompt: format!("question for lesson {i}"),
                        options: vec!["a".into(), "b".into(), "c".into()],
                        correct_index: *k,
                    })
                    .collect(),
            };
            let id = quiz.id;
            catalog.insert_quiz(quiz);
            id
        });
        all.push(Lesson {
            id: lesson_id,
            title: format!("lesson {i}"),
            quiz_id,
        });
        lessons.push(lesson_id);
        quizzes.push(quiz_id);
    }

    let sections = all
        .chunks(2)
        .enumerate()
        .map(|(i, chunk)| Section {
            id: Uuid::new_v4(),
            title: format!("section {i}"),
            lessons: chunk.to_vec(),
        })
        .collect();
    catalog.insert_course(
        CourseStructure {
            course_id,
            sections,
        },
        Some("Dr. Instructor".into()),
    );
    catalog.enroll(LEARNER, course_id);

    let renderer = Arc::new(CountingRenderer::default());
    let engine = ProgressionEngine::new(
        Arc::new(MemoryStore::new()),
        catalog.clone(),
        catalog.clone(),
        renderer.clone(),
        EngineSettings::default(),
    );

    Fixture {
        engine,
        catalog,
        renderer,
        course_id,
        lessons,
        quizzes,
    }
}

/// Watch `lesson` to the end and pass its quiz if it has one.
pub async fn complete_lesson(f: &Fixture, index: usize, key: Option<&[i32]>) {
    let lesson = f.lessons[index];
    f.engine
        .report_playback(LEARNER, f.course_id, lesson, 100.0, 100.0)
        .await
        .unwrap();
    if let (Some(quiz_id), Some(key)) = (f.quizzes[index], key) {
        let out = f
            .engine
            .submit_quiz(LEARNER, f.course_id, lesson, quiz_id, key)
            .await
            .unwrap();
        assert!(out.success);
    }
}

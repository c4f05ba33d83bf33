use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::{CourseCatalog, EnrollmentDirectory};
use crate::error::{EngineError, Result};
use crate::models::{CourseStructure, Quiz};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CourseFixture {
    #[serde(flatten)]
    pub structure: CourseStructure,
    #[serde(default)]
    pub instructor_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnrollmentFixture {
    pub user_id: String,
    pub course_id: Uuid,
}

/// JSON shape accepted by `CATALOG_FILE`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CatalogFixture {
    #[serde(default)]
    pub courses: Vec<CourseFixture>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub enrollments: Vec<EnrollmentFixture>,
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    courses: DashMap<Uuid, CourseFixture>,
    quizzes: DashMap<Uuid, Quiz>,
    enrollments: DashSet<(String, Uuid)>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: CatalogFixture) -> Self {
        let catalog = Self::new();
        for course in fixture.courses {
            catalog.insert_course(course.structure, course.instructor_name);
        }
        for quiz in fixture.quizzes {
            catalog.insert_quiz(quiz);
        }
        for e in fixture.enrollments {
            catalog.enroll(&e.user_id, e.course_id);
        }
        catalog
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::Catalog(format!("{}: {e}", path.display())))?;
        let fixture: CatalogFixture = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Catalog(format!("{}: {e}", path.display())))?;
        tracing::info!(
            courses = fixture.courses.len(),
            quizzes = fixture.quizzes.len(),
            enrollments = fixture.enrollments.len(),
            "loaded catalog fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    pub fn insert_course(&self, structure: CourseStructure, instructor_name: Option<String>) {
        self.courses.insert(
            structure.course_id,
            CourseFixture {
                structure,
                instructor_name,
            },
        );
    }

    pub fn insert_quiz(&self, quiz: Quiz) {
        self.quizzes.insert(quiz.id, quiz);
    }

    pub fn enroll(&self, user_id: &str, course_id: Uuid) {
        self.enrollments.insert((user_id.to_string(), course_id));
    }
}

#[async_trait]
impl CourseCatalog for MemoryCatalog {
    async fn course_structure(&self, course_id: Uuid) -> Result<Option<CourseStructure>> {
        Ok(self.courses.get(&course_id).map(|c| c.structure.clone()))
    }

    async fn quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>> {
        Ok(self.quizzes.get(&quiz_id).map(|q| q.clone()))
    }

    async fn instructor_name(&self, course_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .courses
            .get(&course_id)
            .and_then(|c| c.instructor_name.clone()))
    }
}

#[async_trait]
impl EnrollmentDirectory for MemoryCatalog {
    async fn is_enrolled(&self, user_id: &str, course_id: Uuid) -> Result<bool> {
        Ok(self.enrollments.contains(&(user_id.to_string(), course_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "courses": [{
            "course_id": "6f1c2a8e-0000-4000-8000-000000000001",
            "instructor_name": "Ada Lovelace",
            "sections": [{
                "id": "6f1c2a8e-0000-4000-8000-0000000000a1",
                "title": "Intro",
                "lessons": [
                    {"id": "6f1c2a8e-0000-4000-8000-0000000000b1", "title": "Welcome"},
                    {"id": "6f1c2a8e-0000-4000-8000-0000000000b2", "title": "Basics",
                     "quiz_id": "6f1c2a8e-0000-4000-8000-0000000000c1"}
                ]
            }]
        }],
        "quizzes": [{
            "id": "6f1c2a8e-0000-4000-8000-0000000000c1",
            "lesson_id": "6f1c2a8e-0000-4000-8000-0000000000b2",
            "questions": [{"prompt": "2+2?", "options": ["3", "4"], "correct_index": 1}]
        }],
        "enrollments": [{"user_id": "u1", "course_id": "6f1c2a8e-0000-4000-8000-000000000001"}]
    }"#;

    #[tokio::test]
    async fn loads_fixture_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let catalog = MemoryCatalog::load(file.path()).await.unwrap();
        let course_id: Uuid = "6f1c2a8e-0000-4000-8000-000000000001".parse().unwrap();

        let structure = catalog.course_structure(course_id).await.unwrap().unwrap();
        assert_eq!(structure.lesson_count(), 2);
        assert!(structure.lessons().nth(1).unwrap().has_quiz());
        assert_eq!(
            catalog.instructor_name(course_id).await.unwrap().as_deref(),
            Some("Ada Lovelace")
        );
        assert!(catalog.is_enrolled("u1", course_id).await.unwrap());
        assert!(!catalog.is_enrolled("u2", course_id).await.unwrap());
    }

    #[tokio::test]
    async fn bundled_example_fixture_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/catalog.example.json");
        let catalog = MemoryCatalog::load(path).await.unwrap();
        let course_id: Uuid = "3b0d6a2e-5c1f-4e55-9a57-0c2a1f000001".parse().unwrap();
        let structure = catalog.course_structure(course_id).await.unwrap().unwrap();
        assert_eq!(structure.lesson_count(), 3);
        let quiz_id = structure.lessons().nth(1).and_then(|l| l.quiz_id).unwrap();
        assert_eq!(catalog.quiz(quiz_id).await.unwrap().unwrap().questions.len(), 2);
    }

    #[tokio::test]
    async fn malformed_fixture_is_a_catalog_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = MemoryCatalog::load(file.path()).await.unwrap_err();
        assert!(matches!(err, EngineError::Catalog(_)));
    }
}

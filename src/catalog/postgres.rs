use async_trait::async_trait;
use sqlx::{query_as, query_scalar, PgPool};
use uuid::Uuid;

use super::{CourseCatalog, EnrollmentDirectory};
use crate::error::Result;
use crate::models::{CourseStructure, Lesson, Question, Quiz, Section};

#[derive(sqlx::FromRow, Debug)]
struct OutlineRow {
    section_id: Uuid,
    section_title: String,
    lesson_id: Option<Uuid>,
    lesson_title: Option<String>,
    quiz_id: Option<Uuid>,
}

/// Reads the catalog tables maintained by the course authoring side.
#[derive(Clone, Debug)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseCatalog for PgCatalog {
    async fn course_structure(&self, course_id: Uuid) -> Result<Option<CourseStructure>> {
        let exists: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let rows: Vec<OutlineRow> = query_as(
            r#"
            SELECT s.id AS section_id, s.title AS section_title,
                   l.id AS lesson_id, l.title AS lesson_title,
                   q.id AS quiz_id
            FROM course_sections s
            LEFT JOIN lessons l ON l.section_id = s.id
            LEFT JOIN quizzes q ON q.lesson_id = l.id
            WHERE s.course_id = $1
            ORDER BY s.position, s.id, l.position, l.id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut sections: Vec<Section> = Vec::new();
        for row in rows {
            if sections.last().map(|s| s.id) != Some(row.section_id) {
                sections.push(Section {
                    id: row.section_id,
                    title: row.section_title,
                    lessons: Vec::new(),
                });
            }
            // sections without lessons come back as a single NULL-lesson row
            if let (Some(id), Some(title), Some(section)) =
                (row.lesson_id, row.lesson_title, sections.last_mut())
            {
                section.lessons.push(Lesson {
                    id,
                    title,
                    quiz_id: row.quiz_id,
                });
            }
        }

        Ok(Some(CourseStructure {
            course_id,
            sections,
        }))
    }

    async fn quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>> {
        let lesson_id: Option<Uuid> = query_scalar("SELECT lesson_id FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(lesson_id) = lesson_id else {
            return Ok(None);
        };

        let questions: Vec<Question> = query_as(
            r#"
            SELECT prompt, options, correct_index
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY position
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Quiz {
            id: quiz_id,
            lesson_id,
            questions,
        }))
    }

    async fn instructor_name(&self, course_id: Uuid) -> Result<Option<String>> {
        // Option<Option<_>>: missing row vs. NULL column
        let name: Option<Option<String>> =
            query_scalar("SELECT instructor_name FROM courses WHERE id = $1")
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(name.flatten())
    }
}

#[async_trait]
impl EnrollmentDirectory for PgCatalog {
    async fn is_enrolled(&self, user_id: &str, course_id: Uuid) -> Result<bool> {
        let enrolled: bool = query_scalar(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrolled)
    }
}

//! Collaborators owned by other parts of the platform: course structure,
//! quizzes, enrollment, and instructor names. The engine only reads them.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CourseStructure, Quiz};

pub mod memory;
pub mod postgres;

pub use memory::{CatalogFixture, MemoryCatalog};
pub use postgres::PgCatalog;

#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// `None` when the course does not exist.
    async fn course_structure(&self, course_id: Uuid) -> Result<Option<CourseStructure>>;

    async fn quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>>;

    async fn instructor_name(&self, course_id: Uuid) -> Result<Option<String>>;
}

#[async_trait]
pub trait EnrollmentDirectory: Send + Sync {
    async fn is_enrolled(&self, user_id: &str, course_id: Uuid) -> Result<bool>;
}

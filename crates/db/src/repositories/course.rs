//! Course repository.

use crate::entities::{course, Course};
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait};

/// Course repository for database operations.
#[derive(Clone, Default)]
pub struct CourseRepository;

impl CourseRepository {
    /// Create a new course repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a course by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<course::Model>> {
        Course::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Create a new course.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: course::ActiveModel,
    ) -> AppResult<course::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }
}

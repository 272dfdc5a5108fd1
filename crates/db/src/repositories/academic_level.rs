//! Academic level repository.

use crate::entities::{academic_level, AcademicLevel};
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder};

/// Academic level repository for database operations.
#[derive(Clone, Default)]
pub struct AcademicLevelRepository;

impl AcademicLevelRepository {
    /// Create a new academic level repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a level by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<academic_level::Model>> {
        AcademicLevel::find_by_id(id)
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new level.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: academic_level::ActiveModel,
    ) -> AppResult<academic_level::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// All levels in progression order.
    pub async fn list<C: ConnectionTrait>(&self, conn: &C) -> AppResult<Vec<academic_level::Model>> {
        AcademicLevel::find()
            .order_by_asc(academic_level::Column::SortOrder)
            .all(conn)
            .await
            .map_err(map_db_err)
    }
}

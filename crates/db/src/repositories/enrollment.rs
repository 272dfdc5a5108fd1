//! Enrollment repository.

use crate::entities::enrollment::{self, EnrollmentStatus};
use crate::entities::Enrollment;
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Enrollment repository for database operations.
#[derive(Clone, Default)]
pub struct EnrollmentRepository;

impl EnrollmentRepository {
    /// Create a new enrollment repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find an enrollment by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<enrollment::Model>> {
        Enrollment::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Whether the student holds an active seat in the course.
    pub async fn is_enrolled<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<bool> {
        let count = Enrollment::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
            .count(conn)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }

    /// Active enrollments of a student.
    pub async fn find_active_for_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<enrollment::Model>> {
        Enrollment::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
            .order_by_asc(enrollment::Column::EnrolledAt)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// All enrollments of a student, newest first.
    pub async fn find_by_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<enrollment::Model>> {
        Enrollment::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .order_by_desc(enrollment::Column::EnrolledAt)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new enrollment.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: enrollment::ActiveModel,
    ) -> AppResult<enrollment::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update an enrollment.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: enrollment::ActiveModel,
    ) -> AppResult<enrollment::Model> {
        model.update(conn).await.map_err(map_db_err)
    }
}

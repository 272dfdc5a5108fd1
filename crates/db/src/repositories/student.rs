//! Student repository.

use crate::entities::{student, Student};
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

/// Student repository for database operations.
#[derive(Clone, Default)]
pub struct StudentRepository;

impl StudentRepository {
    /// Create a new student repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a student by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<student::Model>> {
        Student::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Find the student profile of an account.
    pub async fn find_by_account_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
    ) -> AppResult<Option<student::Model>> {
        Student::find()
            .filter(student::Column::AccountId.eq(account_id))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new student.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: student::ActiveModel,
    ) -> AppResult<student::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update a student.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: student::ActiveModel,
    ) -> AppResult<student::Model> {
        model.update(conn).await.map_err(map_db_err)
    }
}

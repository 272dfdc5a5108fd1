//! Guardian repository (guardians and their student links).

use crate::entities::{guardian, guardian_student, Guardian, GuardianStudent};
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Guardian repository for database operations.
#[derive(Clone, Default)]
pub struct GuardianRepository;

impl GuardianRepository {
    /// Create a new guardian repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a guardian by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<guardian::Model>> {
        Guardian::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Find the guardian profile of an account.
    pub async fn find_by_account_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
    ) -> AppResult<Option<guardian::Model>> {
        Guardian::find()
            .filter(guardian::Column::AccountId.eq(account_id))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new guardian.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: guardian::ActiveModel,
    ) -> AppResult<guardian::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Find the link between a guardian and a student.
    pub async fn find_link<C: ConnectionTrait>(
        &self,
        conn: &C,
        guardian_id: &str,
        student_id: &str,
    ) -> AppResult<Option<guardian_student::Model>> {
        GuardianStudent::find()
            .filter(guardian_student::Column::GuardianId.eq(guardian_id))
            .filter(guardian_student::Column::StudentId.eq(student_id))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// All guardian links of a student, primary contact first.
    pub async fn find_links_for_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<guardian_student::Model>> {
        GuardianStudent::find()
            .filter(guardian_student::Column::StudentId.eq(student_id))
            .order_by_desc(guardian_student::Column::IsPrimaryContact)
            .order_by_asc(guardian_student::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Whether the student has a primary-contact guardian.
    pub async fn has_primary_guardian<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<bool> {
        let count = GuardianStudent::find()
            .filter(guardian_student::Column::StudentId.eq(student_id))
            .filter(guardian_student::Column::IsPrimaryContact.eq(true))
            .count(conn)
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }

    /// Create a guardian-student link.
    pub async fn create_link<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: guardian_student::ActiveModel,
    ) -> AppResult<guardian_student::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update a guardian-student link.
    pub async fn update_link<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: guardian_student::ActiveModel,
    ) -> AppResult<guardian_student::Model> {
        model.update(conn).await.map_err(map_db_err)
    }
}

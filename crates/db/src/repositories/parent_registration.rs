//! Parent registration repository.

use crate::entities::parent_registration::{self, RegistrationStatus};
use crate::entities::ParentRegistration;
use crate::map_db_err;
use academy_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    prelude::DateTimeWithTimeZone,
};

/// Parent registration repository for database operations.
#[derive(Clone, Default)]
pub struct ParentRegistrationRepository;

impl ParentRegistrationRepository {
    /// Create a new parent registration repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a registration by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<parent_registration::Model>> {
        ParentRegistration::find_by_id(id)
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Find a registration by its business code.
    pub async fn find_by_code<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
    ) -> AppResult<Option<parent_registration::Model>> {
        ParentRegistration::find()
            .filter(parent_registration::Column::RegistrationCode.eq(code))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Find the registration for a guardian email.
    pub async fn find_by_email<C: ConnectionTrait>(
        &self,
        conn: &C,
        email: &str,
    ) -> AppResult<Option<parent_registration::Model>> {
        ParentRegistration::find()
            .filter(parent_registration::Column::GuardianEmail.eq(email.to_lowercase()))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Pending registrations whose expiry is at or before `now`.
    pub async fn find_stale_pending<C: ConnectionTrait>(
        &self,
        conn: &C,
        now: DateTimeWithTimeZone,
    ) -> AppResult<Vec<parent_registration::Model>> {
        ParentRegistration::find()
            .filter(parent_registration::Column::Status.eq(RegistrationStatus::Pending))
            .filter(parent_registration::Column::ExpiresAt.lte(now))
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new registration.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: parent_registration::ActiveModel,
    ) -> AppResult<parent_registration::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update a registration.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: parent_registration::ActiveModel,
    ) -> AppResult<parent_registration::Model> {
        model.update(conn).await.map_err(map_db_err)
    }
}

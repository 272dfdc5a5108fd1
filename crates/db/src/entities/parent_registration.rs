//! Parent registration entity (guardian account provisioned on a student's behalf).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Registration status as stored. Use `effective_status` for reads.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parent_registration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub registration_code: String,

    pub student_id: String,

    pub enrollment_request_id: String,

    /// Lowercased guardian email
    #[sea_orm(unique)]
    pub guardian_email: String,

    /// Argon2 hash of the temporary password sent in the welcome notice
    #[serde(skip_serializing)]
    pub temporary_password_hash: String,

    pub status: RegistrationStatus,

    pub expires_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub created_guardian_id: Option<String>,

    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Status as observed at `now`: a pending registration past its
    /// expiry reads as expired even before the sweep persists it.
    #[must_use]
    pub fn effective_status(&self, now: DateTimeWithTimeZone) -> RegistrationStatus {
        match self.status {
            RegistrationStatus::Pending if now >= self.expires_at => RegistrationStatus::Expired,
            status => status,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::enrollment_request::Entity",
        from = "Column::EnrollmentRequestId",
        to = "super::enrollment_request::Column::Id",
        on_delete = "Cascade"
    )]
    EnrollmentRequest,
    #[sea_orm(
        belongs_to = "super::guardian::Entity",
        from = "Column::CreatedGuardianId",
        to = "super::guardian::Column::Id"
    )]
    Guardian,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::enrollment_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnrollmentRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Student entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Overall enrollment status of a student.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    /// Registered but not yet enrolled in any course
    #[sea_orm(string_value = "prospective")]
    #[default]
    Prospective,
    #[sea_orm(string_value = "enrolled")]
    Enrolled,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub account_id: String,

    /// Current academic level (NULL = not yet placed)
    #[sea_orm(nullable)]
    pub academic_level_id: Option<String>,

    #[sea_orm(nullable)]
    pub date_of_birth: Option<Date>,

    /// Whether a guardian must act for this student unless they are of adult
    /// age; adults always pay for themselves
    #[sea_orm(default_value = true)]
    pub requires_guardian: bool,

    pub enrollment_status: StudentStatus,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::academic_level::Entity",
        from = "Column::AcademicLevelId",
        to = "super::academic_level::Column::Id"
    )]
    AcademicLevel,
    #[sea_orm(has_many = "super::guardian_student::Entity")]
    GuardianLinks,
    #[sea_orm(has_many = "super::enrollment_request::Entity")]
    EnrollmentRequests,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::academic_level::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicLevel.def()
    }
}

impl Related<super::guardian_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GuardianLinks.def()
    }
}

impl Related<super::enrollment_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnrollmentRequests.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Guardian ↔ student link with per-link permissions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How the guardian relates to the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    #[sea_orm(string_value = "mother")]
    Mother,
    #[sea_orm(string_value = "father")]
    Father,
    #[sea_orm(string_value = "guardian")]
    #[default]
    Guardian,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guardian_student")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub guardian_id: String,

    pub student_id: String,

    pub relationship_kind: RelationshipKind,

    #[sea_orm(default_value = false)]
    pub is_primary_contact: bool,

    #[sea_orm(default_value = true)]
    pub can_view_grades: bool,

    #[sea_orm(default_value = true)]
    pub can_view_attendance: bool,

    /// Only confirmed links count for payment routing
    #[sea_orm(default_value = false)]
    pub is_confirmed: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::guardian::Entity",
        from = "Column::GuardianId",
        to = "super::guardian::Column::Id",
        on_delete = "Cascade"
    )]
    Guardian,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::guardian::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guardian.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Course entity (pricing and level restriction only).

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::Frequency;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    /// Restricts eligibility to one level (NULL = open to all levels)
    #[sea_orm(nullable)]
    pub academic_level_id: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub price_3x_weekly: Option<Decimal>,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub price_5x_weekly: Option<Decimal>,

    pub subscription_duration_weeks: i32,

    #[sea_orm(nullable)]
    pub currency: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Configured price for a frequency, if set.
    #[must_use]
    pub const fn price_for(&self, frequency: Frequency) -> Option<Decimal> {
        match frequency {
            Frequency::ThreeWeekly => self.price_3x_weekly,
            Frequency::FiveWeekly => self.price_5x_weekly,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::academic_level::Entity",
        from = "Column::AcademicLevelId",
        to = "super::academic_level::Column::Id"
    )]
    AcademicLevel,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::academic_level::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicLevel.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

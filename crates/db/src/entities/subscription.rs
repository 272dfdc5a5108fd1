//! Subscription entity (time-boxed, session-limited course access).

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::Frequency;

/// Subscription status.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "active")]
    #[default]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub subscription_code: String,

    pub student_id: String,

    pub course_id: String,

    /// One subscription per payment
    #[sea_orm(unique)]
    pub payment_id: String,

    pub frequency: Frequency,

    pub start_date: Date,

    pub end_date: Date,

    pub status: SubscriptionStatus,

    pub total_sessions: i32,

    pub sessions_attended: i32,

    pub sessions_remaining: i32,

    /// Why the subscription left `active` (e.g. "all sessions completed")
    #[sea_orm(column_type = "Text", nullable)]
    pub status_reason: Option<String>,

    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeWithTimeZone>,

    /// When the "expiring soon" notice went out (sent at most once)
    #[sea_orm(nullable)]
    pub expiring_notified_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Share of sessions attended, in percent (0 when there are no sessions).
    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        if self.total_sessions <= 0 {
            return 0.0;
        }
        f64::from(self.sessions_attended) / f64::from(self.total_sessions) * 100.0
    }

    /// Whole days from `today` until `end_date` (negative once past).
    #[must_use]
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }

    /// Active and ending within `within_days` of `today` (inclusive).
    #[must_use]
    pub fn is_expiring_soon(&self, today: NaiveDate, within_days: i64) -> bool {
        let days = self.days_remaining(today);
        self.status == SubscriptionStatus::Active && (0..=within_days).contains(&days)
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
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id"
    )]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Enrollment request entity.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::Frequency;

/// Enrollment request status.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "parent_notified")]
    ParentNotified,
    #[sea_orm(string_value = "payment_pending")]
    PaymentPending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl RequestStatus {
    /// Statuses that hold the (student, course) slot.
    pub const ACTIVE: [Self; 3] = [Self::Pending, Self::ParentNotified, Self::PaymentPending];

    /// Whether the request still occupies the (student, course) slot.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::ParentNotified | Self::PaymentPending
        )
    }

    /// Whether no further transition is accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ParentNotified => "parent_notified",
            Self::PaymentPending => "payment_pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Who must act next on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "snake_case")]
pub enum RoutingPath {
    #[sea_orm(string_value = "parent_payment")]
    ParentPayment,
    #[sea_orm(string_value = "student_payment")]
    StudentPayment,
    #[sea_orm(string_value = "parent_registration")]
    ParentRegistration,
    #[sea_orm(string_value = "admin_review")]
    AdminReview,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollment_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub request_code: String,

    pub student_id: String,

    pub course_id: String,

    pub frequency: Frequency,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub quoted_price: Decimal,

    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,

    pub status: RequestStatus,

    /// Set once by the first `notify`
    #[sea_orm(nullable)]
    pub routing_path: Option<RoutingPath>,

    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,

    #[sea_orm(nullable)]
    pub enrollment_id: Option<String>,

    #[sea_orm(nullable)]
    pub reviewed_by: Option<String>,

    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTimeWithTimeZone>,

    /// `student_id:course_id` while active, NULL once terminal.
    /// A unique index over it enforces one active request per pair.
    #[sea_orm(unique, nullable)]
    #[serde(skip)]
    pub active_key: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

/// Build the slot key for an active request.
#[must_use]
pub fn active_key(student_id: &str, course_id: &str) -> String {
    format!("{student_id}:{course_id}")
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
        to = "super::course::Column::Id",
        on_delete = "Cascade"
    )]
    Course,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_statuses() {
        assert_eq!(RequestStatus::default(), RequestStatus::Pending);
        for status in RequestStatus::ACTIVE {
            assert!(status.is_active());
        }
        for status in [
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_active_key_format() {
        assert_eq!(active_key("s1", "c1"), "s1:c1");
    }
}

//! Subscription repository.

use crate::entities::subscription::{self, SubscriptionStatus};
use crate::entities::Subscription;
use crate::map_db_err;
use academy_common::AppResult;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};

/// Subscription repository for database operations.
#[derive(Clone, Default)]
pub struct SubscriptionRepository;

impl SubscriptionRepository {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a subscription by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find_by_id(id)
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Find the subscription created from a payment.
    pub async fn find_by_payment<C: ConnectionTrait>(
        &self,
        conn: &C,
        payment_id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::PaymentId.eq(payment_id))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Subscriptions of a student, newest first.
    pub async fn find_by_student<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::StudentId.eq(student_id))
            .order_by_desc(subscription::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Active subscriptions whose end date is before `today`.
    pub async fn find_overdue<C: ConnectionTrait>(
        &self,
        conn: &C,
        today: NaiveDate,
    ) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::Status.eq(SubscriptionStatus::Active))
            .filter(subscription::Column::EndDate.lt(today))
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Active subscriptions ending between `from` and `to` (inclusive)
    /// that have not been sent an expiry notice yet.
    pub async fn find_unnotified_ending_between<C: ConnectionTrait>(
        &self,
        conn: &C,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::Status.eq(SubscriptionStatus::Active))
            .filter(subscription::Column::EndDate.between(from, to))
            .filter(subscription::Column::ExpiringNotifiedAt.is_null())
            .order_by_asc(subscription::Column::EndDate)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new subscription.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: subscription::ActiveModel,
    ) -> AppResult<subscription::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update a subscription.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: subscription::ActiveModel,
    ) -> AppResult<subscription::Model> {
        model.update(conn).await.map_err(map_db_err)
    }

    /// Claim the expiry notice for a subscription. Returns `false` when it
    /// was already claimed, so each subscription is announced once.
    pub async fn mark_expiring_notified<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        now: DateTimeWithTimeZone,
    ) -> AppResult<bool> {
        let result = Subscription::update_many()
            .col_expr(
                subscription::Column::ExpiringNotifiedAt,
                Expr::value(Some(now)),
            )
            .filter(subscription::Column::Id.eq(id))
            .filter(subscription::Column::ExpiringNotifiedAt.is_null())
            .exec(conn)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected == 1)
    }

    /// Atomically move one session from remaining to attended.
    ///
    /// Only applies while the subscription is active with sessions left;
    /// returns whether a row was changed.
    pub async fn consume_session<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        now: DateTimeWithTimeZone,
    ) -> AppResult<bool> {
        let result = Subscription::update_many()
            .col_expr(
                subscription::Column::SessionsAttended,
                Expr::col(subscription::Column::SessionsAttended).add(1),
            )
            .col_expr(
                subscription::Column::SessionsRemaining,
                Expr::col(subscription::Column::SessionsRemaining).sub(1),
            )
            .col_expr(subscription::Column::UpdatedAt, Expr::value(now))
            .filter(subscription::Column::Id.eq(id))
            .filter(subscription::Column::Status.eq(SubscriptionStatus::Active))
            .filter(subscription::Column::SessionsRemaining.gt(0))
            .exec(conn)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected == 1)
    }
}

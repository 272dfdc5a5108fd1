//! Subscription lifecycle service.

use std::sync::Arc;

use academy_common::{
    AppError, AppResult, CodeKind, IdGenerator, Metrics, config::EnrollmentConfig, get_metrics,
};
use academy_db::{
    entities::{
        Frequency, course, payment,
        subscription::{self, SubscriptionStatus},
    },
    map_db_err,
    repositories::SubscriptionRepository,
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use tracing::info;

use crate::services::codes::CodeGenerator;
use crate::services::event_sink::{DomainEvent, EventSinkService, dispatch};

/// Status reason recorded when the last session is attended.
pub const REASON_SESSIONS_COMPLETED: &str = "all sessions completed";

/// Status reason recorded when the end date passes.
pub const REASON_PERIOD_ENDED: &str = "subscription period ended";

/// Parameters for the subscription created when a payment is verified.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionParams {
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    /// Defaults to the course's subscription duration.
    pub duration_weeks: Option<i32>,
}

/// Session plan derived from a start date, duration, and frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSchedule {
    pub end_date: NaiveDate,
    pub total_sessions: i32,
}

/// Compute the end date and session count for a subscription.
pub fn schedule(
    start_date: NaiveDate,
    duration_weeks: i32,
    frequency: Frequency,
) -> AppResult<SessionSchedule> {
    if duration_weeks <= 0 {
        return Err(AppError::Validation(
            "Subscription duration must be at least one week".to_string(),
        ));
    }

    let end_date = start_date
        .checked_add_signed(Duration::weeks(i64::from(duration_weeks)))
        .ok_or_else(|| AppError::Validation("Subscription end date out of range".to_string()))?;

    let whole_weeks = (end_date - start_date).num_days() / 7;
    let total_sessions = i32::try_from(whole_weeks)
        .ok()
        .and_then(|weeks| weeks.checked_mul(frequency.sessions_per_week()))
        .ok_or_else(|| AppError::Validation("Subscription is too long".to_string()))?;

    Ok(SessionSchedule {
        end_date,
        total_sessions,
    })
}

/// Outcome of a maintenance sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Subscriptions moved to `expired`.
    pub expired: Vec<String>,
    /// Subscriptions newly announced as expiring soon. A subscription is
    /// announced on the first sweep that finds it inside the window.
    pub expiring: Vec<String>,
}

/// Subscription lifecycle service.
#[derive(Clone)]
pub struct SubscriptionService {
    db: Arc<DatabaseConnection>,
    codes: CodeGenerator,
    id_gen: IdGenerator,
    subscription_repo: SubscriptionRepository,
    event_sink: Option<EventSinkService>,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &EnrollmentConfig, id_gen: IdGenerator) -> Self {
        Self {
            db,
            codes: CodeGenerator::new(id_gen.clone(), config.code_retry_cap),
            id_gen,
            subscription_repo: SubscriptionRepository::new(),
            event_sink: None,
        }
    }

    /// Set the event sink for lifecycle notifications.
    pub fn set_event_sink(&mut self, event_sink: EventSinkService) {
        self.event_sink = Some(event_sink);
    }

    /// Create the subscription for a verified payment inside the caller's
    /// transaction.
    pub(crate) async fn create_in<C>(
        &self,
        conn: &C,
        payment: &payment::Model,
        course: &course::Model,
        params: &SubscriptionParams,
    ) -> AppResult<subscription::Model>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let weeks = params
            .duration_weeks
            .unwrap_or(course.subscription_duration_weeks);
        let plan = schedule(params.start_date, weeks, params.frequency)?;
        let now = Utc::now();

        let subscription = self
            .codes
            .insert_with_code(conn, CodeKind::Subscription, "subscription_code", |code| {
                subscription::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    subscription_code: Set(code),
                    student_id: Set(payment.student_id.clone()),
                    course_id: Set(payment.course_id.clone()),
                    payment_id: Set(payment.id.clone()),
                    frequency: Set(params.frequency),
                    start_date: Set(params.start_date),
                    end_date: Set(plan.end_date),
                    status: Set(SubscriptionStatus::Active),
                    total_sessions: Set(plan.total_sessions),
                    sessions_attended: Set(0),
                    sessions_remaining: Set(plan.total_sessions),
                    status_reason: Set(None),
                    cancelled_at: Set(None),
                    expiring_notified_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                }
            })
            .await
            .map_err(|e| {
                if e.is_conflict_on("payment_id") {
                    AppError::Conflict("Payment already has a subscription".to_string())
                } else {
                    e
                }
            })?;

        Metrics::incr(&get_metrics().subscriptions_created);
        info!(
            subscription_code = %subscription.subscription_code,
            payment_id = %payment.id,
            total_sessions = subscription.total_sessions,
            "Created subscription"
        );

        Ok(subscription)
    }

    /// Get a subscription by ID.
    pub async fn get(&self, id: &str) -> AppResult<subscription::Model> {
        self.subscription_repo
            .find_by_id(self.db.as_ref(), id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))
    }

    /// Subscriptions of a student, newest first.
    pub async fn list_for_student(&self, student_id: &str) -> AppResult<Vec<subscription::Model>> {
        self.subscription_repo
            .find_by_student(self.db.as_ref(), student_id)
            .await
    }

    /// Record one attended session.
    ///
    /// Attending the last session expires the subscription.
    pub async fn record_attendance(&self, id: &str) -> AppResult<subscription::Model> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let now = Utc::now();

        let current = self
            .subscription_repo
            .find_by_id(&txn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;
        if current.status != SubscriptionStatus::Active {
            return Err(AppError::InvalidState(format!(
                "Cannot record attendance on a {} subscription",
                status_str(current.status)
            )));
        }

        if !self
            .subscription_repo
            .consume_session(&txn, id, now.into())
            .await?
        {
            return Err(AppError::InvalidState(
                "Subscription has no sessions remaining".to_string(),
            ));
        }

        let mut updated = self
            .subscription_repo
            .find_by_id(&txn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        let mut events = Vec::new();
        if updated.sessions_remaining == 0 {
            updated = self
                .expire_in(&txn, updated, REASON_SESSIONS_COMPLETED)
                .await?;
            events.push(expired_event(&updated));
        }

        txn.commit().await.map_err(map_db_err)?;
        dispatch(self.event_sink.as_ref(), events).await;

        Ok(updated)
    }

    /// Expire the subscription if its end date has passed. Idempotent.
    pub async fn check_expiry(&self, id: &str, today: NaiveDate) -> AppResult<subscription::Model> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let current = self
            .subscription_repo
            .find_by_id(&txn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        if current.status != SubscriptionStatus::Active || current.end_date >= today {
            return Ok(current);
        }

        let expired = self.expire_in(&txn, current, REASON_PERIOD_ENDED).await?;
        txn.commit().await.map_err(map_db_err)?;

        dispatch(self.event_sink.as_ref(), vec![expired_event(&expired)]).await;
        Ok(expired)
    }

    /// Cancel an active or suspended subscription.
    pub async fn cancel(&self, id: &str, reason: &str) -> AppResult<subscription::Model> {
        let now = Utc::now();
        self.transition(id, |current| match current.status {
            SubscriptionStatus::Active | SubscriptionStatus::Suspended => {
                let mut active: subscription::ActiveModel = current.into();
                active.status = Set(SubscriptionStatus::Cancelled);
                active.status_reason = Set(Some(reason.to_string()));
                active.cancelled_at = Set(Some(now.into()));
                active.updated_at = Set(Some(now.into()));
                Ok(active)
            }
            other => Err(AppError::InvalidState(format!(
                "Cannot cancel a {} subscription",
                status_str(other)
            ))),
        })
        .await
    }

    /// Suspend an active subscription.
    pub async fn suspend(&self, id: &str, reason: &str) -> AppResult<subscription::Model> {
        let now = Utc::now();
        self.transition(id, |current| match current.status {
            SubscriptionStatus::Active => {
                let mut active: subscription::ActiveModel = current.into();
                active.status = Set(SubscriptionStatus::Suspended);
                active.status_reason = Set(Some(reason.to_string()));
                active.updated_at = Set(Some(now.into()));
                Ok(active)
            }
            other => Err(AppError::InvalidState(format!(
                "Cannot suspend a {} subscription",
                status_str(other)
            ))),
        })
        .await
    }

    /// Reactivate a suspended subscription whose end date is still ahead.
    pub async fn reactivate(&self, id: &str, today: NaiveDate) -> AppResult<subscription::Model> {
        let now = Utc::now();
        self.transition(id, |current| match current.status {
            SubscriptionStatus::Suspended if current.end_date > today => {
                let mut active: subscription::ActiveModel = current.into();
                active.status = Set(SubscriptionStatus::Active);
                active.status_reason = Set(None);
                active.updated_at = Set(Some(now.into()));
                Ok(active)
            }
            SubscriptionStatus::Suspended => Err(AppError::InvalidState(
                "Subscription period has already ended".to_string(),
            )),
            other => Err(AppError::InvalidState(format!(
                "Cannot reactivate a {} subscription",
                status_str(other)
            ))),
        })
        .await
    }

    /// Expire overdue subscriptions and flag those ending within
    /// `within_days`.
    pub async fn sweep(&self, today: NaiveDate, within_days: i64) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();
        let mut events = Vec::new();

        let txn = self.db.begin().await.map_err(map_db_err)?;
        for current in self.subscription_repo.find_overdue(&txn, today).await? {
            let expired = self.expire_in(&txn, current, REASON_PERIOD_ENDED).await?;
            events.push(expired_event(&expired));
            report.expired.push(expired.id);
        }

        let horizon = today + Duration::days(within_days.max(0));
        let now = Utc::now();
        for current in self
            .subscription_repo
            .find_unnotified_ending_between(&txn, today, horizon)
            .await?
        {
            if !self
                .subscription_repo
                .mark_expiring_notified(&txn, &current.id, now.into())
                .await?
            {
                continue;
            }
            events.push(DomainEvent::SubscriptionExpiring {
                subscription_id: current.id.clone(),
                days_remaining: current.days_remaining(today),
            });
            report.expiring.push(current.id);
        }
        txn.commit().await.map_err(map_db_err)?;

        if !report.expired.is_empty() || !report.expiring.is_empty() {
            info!(
                expired = report.expired.len(),
                expiring = report.expiring.len(),
                "Subscription sweep finished"
            );
        }

        dispatch(self.event_sink.as_ref(), events).await;
        Ok(report)
    }

    async fn expire_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        current: subscription::Model,
        reason: &str,
    ) -> AppResult<subscription::Model> {
        let mut active: subscription::ActiveModel = current.into();
        active.status = Set(SubscriptionStatus::Expired);
        active.status_reason = Set(Some(reason.to_string()));
        active.updated_at = Set(Some(Utc::now().into()));
        let expired = self.subscription_repo.update(conn, active).await?;

        Metrics::incr(&get_metrics().subscriptions_expired);
        info!(subscription_code = %expired.subscription_code, reason, "Subscription expired");
        Ok(expired)
    }

    async fn transition<F>(&self, id: &str, apply: F) -> AppResult<subscription::Model>
    where
        F: FnOnce(subscription::Model) -> AppResult<subscription::ActiveModel> + Send,
    {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let current = self
            .subscription_repo
            .find_by_id(&txn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;
        let from = current.status;

        let updated = self.subscription_repo.update(&txn, apply(current)?).await?;
        txn.commit().await.map_err(map_db_err)?;

        info!(
            subscription_code = %updated.subscription_code,
            from = status_str(from),
            to = status_str(updated.status),
            "Subscription status changed"
        );
        Ok(updated)
    }
}

fn expired_event(subscription: &subscription::Model) -> DomainEvent {
    DomainEvent::SubscriptionExpired {
        subscription_id: subscription.id.clone(),
        reason: subscription.status_reason.clone().unwrap_or_default(),
    }
}

const fn status_str(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::Expired => "expired",
        SubscriptionStatus::Cancelled => "cancelled",
        SubscriptionStatus::Suspended => "suspended",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_schedule_three_times_weekly() {
        let plan = schedule(date(2026, 1, 5), 4, Frequency::ThreeWeekly).unwrap();
        assert_eq!(plan.end_date, date(2026, 2, 2));
        assert_eq!(plan.total_sessions, 12);
    }

    #[test]
    fn test_schedule_five_times_weekly() {
        let plan = schedule(date(2026, 3, 1), 12, Frequency::FiveWeekly).unwrap();
        assert_eq!(plan.end_date, date(2026, 5, 24));
        assert_eq!(plan.total_sessions, 60);
    }

    #[test]
    fn test_schedule_rejects_non_positive_duration() {
        assert!(matches!(
            schedule(date(2026, 1, 1), 0, Frequency::ThreeWeekly),
            Err(AppError::Validation(_))
        ));
        assert!(schedule(date(2026, 1, 1), -2, Frequency::FiveWeekly).is_err());
    }
}

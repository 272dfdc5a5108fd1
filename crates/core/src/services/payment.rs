//! Payment verification service.

use std::sync::Arc;

use academy_common::{
    AppError, AppResult, CodeKind, IdGenerator, Metrics, config::EnrollmentConfig, get_metrics,
};
use academy_db::{
    entities::{
        enrollment, enrollment_request,
        payment::{self, PaymentStatus},
        subscription,
    },
    map_db_err,
    repositories::{
        CourseRepository, EnrollmentRepository, EnrollmentRequestRepository, PaymentRepository,
        StudentRepository,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::services::codes::CodeGenerator;
use crate::services::enrollment_request::{
    EnrollmentRequestService, REASON_ALREADY_ENROLLED, rejected_event,
};
use crate::services::event_sink::{DomainEvent, EventSinkService, dispatch};
use crate::services::subscription::{SubscriptionParams, SubscriptionService};

/// Input for submitting a payment receipt.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentInput {
    pub student_id: String,
    pub guardian_id: Option<String>,
    pub course_id: String,
    pub enrollment_request_id: Option<String>,
    pub amount: Decimal,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(length(min = 1, max = 512))]
    pub receipt_ref: String,
}

/// Everything a verification changed.
#[derive(Debug, Clone)]
pub struct PaymentVerification {
    pub payment: payment::Model,
    pub subscription: Option<subscription::Model>,
    /// The request approved (or rejected as already enrolled) by this payment.
    pub enrollment_request: Option<enrollment_request::Model>,
    pub enrollment: Option<enrollment::Model>,
}

/// Payment verification service.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    codes: CodeGenerator,
    id_gen: IdGenerator,
    default_currency: String,
    requests: EnrollmentRequestService,
    subscriptions: SubscriptionService,
    payment_repo: PaymentRepository,
    request_repo: EnrollmentRequestRepository,
    enrollment_repo: EnrollmentRepository,
    student_repo: StudentRepository,
    course_repo: CourseRepository,
    event_sink: Option<EventSinkService>,
}

impl PaymentService {
    /// Create a new payment service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &EnrollmentConfig,
        id_gen: IdGenerator,
        requests: EnrollmentRequestService,
        subscriptions: SubscriptionService,
    ) -> Self {
        Self {
            db,
            codes: CodeGenerator::new(id_gen.clone(), config.code_retry_cap),
            id_gen,
            default_currency: config.default_currency.clone(),
            requests,
            subscriptions,
            payment_repo: PaymentRepository::new(),
            request_repo: EnrollmentRequestRepository::new(),
            enrollment_repo: EnrollmentRepository::new(),
            student_repo: StudentRepository::new(),
            course_repo: CourseRepository::new(),
            event_sink: None,
        }
    }

    /// Set the event sink for workflow notifications.
    pub fn set_event_sink(&mut self, event_sink: EventSinkService) {
        self.event_sink = Some(event_sink);
    }

    /// Record an uploaded payment in `pending`.
    pub async fn submit(&self, input: SubmitPaymentInput) -> AppResult<payment::Model> {
        input.validate()?;
        if input.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        self.student_repo
            .find_by_id(&txn, &input.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
        let course = self
            .course_repo
            .find_by_id(&txn, &input.course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        if let Some(request_id) = input.enrollment_request_id.as_deref() {
            let request = self
                .request_repo
                .find_by_id(&txn, request_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Enrollment request not found".to_string()))?;
            if request.student_id != input.student_id || request.course_id != input.course_id {
                return Err(AppError::Validation(
                    "Enrollment request does not match the payment's student and course"
                        .to_string(),
                ));
            }
        }

        let currency = input
            .currency
            .clone()
            .or(course.currency)
            .unwrap_or_else(|| self.default_currency.clone())
            .to_uppercase();
        let now = Utc::now();

        let payment = self
            .codes
            .insert_with_code(&txn, CodeKind::Payment, "payment_reference", |code| {
                payment::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    payment_reference: Set(code),
                    student_id: Set(input.student_id.clone()),
                    guardian_id: Set(input.guardian_id.clone()),
                    course_id: Set(input.course_id.clone()),
                    enrollment_request_id: Set(input.enrollment_request_id.clone()),
                    amount: Set(input.amount),
                    currency: Set(currency.clone()),
                    receipt_ref: Set(input.receipt_ref.clone()),
                    status: Set(PaymentStatus::Pending),
                    admin_notes: Set(None),
                    verified_by: Set(None),
                    verified_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                }
            })
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        Metrics::incr(&get_metrics().payments_submitted);
        info!(
            payment_reference = %payment.payment_reference,
            student_id = %payment.student_id,
            amount = %payment.amount,
            "Payment submitted"
        );
        dispatch(
            self.event_sink.as_ref(),
            vec![DomainEvent::PaymentSubmitted {
                payment_id: payment.id.clone(),
            }],
        )
        .await;

        Ok(payment)
    }

    /// Verify a pending payment.
    ///
    /// With `params`, the subscription is created and the matching active
    /// request approved in the same transaction.
    pub async fn verify(
        &self,
        payment_id: &str,
        admin_id: &str,
        notes: Option<String>,
        params: Option<SubscriptionParams>,
    ) -> AppResult<PaymentVerification> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let current = self.load(&txn, payment_id).await?;
        if current.status != PaymentStatus::Pending {
            return Err(not_pending(current.status, "verify"));
        }

        let now = Utc::now();
        let mut active: payment::ActiveModel = current.into();
        active.status = Set(PaymentStatus::Verified);
        active.verified_by = Set(Some(admin_id.to_string()));
        active.verified_at = Set(Some(now.into()));
        if notes.is_some() {
            active.admin_notes = Set(notes);
        }
        active.updated_at = Set(Some(now.into()));
        let payment = self.settle(&txn, payment_id, active, "verify").await?;

        let mut verification = PaymentVerification {
            payment,
            subscription: None,
            enrollment_request: None,
            enrollment: None,
        };
        let mut events = vec![DomainEvent::PaymentVerified {
            payment_id: verification.payment.id.clone(),
        }];

        if let Some(params) = params {
            let course = self
                .course_repo
                .find_by_id(&txn, &verification.payment.course_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

            verification.subscription = Some(
                self.subscriptions
                    .create_in(&txn, &verification.payment, &course, &params)
                    .await?,
            );

            self.settle_enrollment(&txn, admin_id, &mut verification, &mut events)
                .await?;
        }

        txn.commit().await.map_err(map_db_err)?;

        Metrics::incr(&get_metrics().payments_verified);
        info!(
            payment_reference = %verification.payment.payment_reference,
            admin_id = %admin_id,
            subscription = verification.subscription.is_some(),
            "Payment verified"
        );
        dispatch(self.event_sink.as_ref(), events).await;

        Ok(verification)
    }

    /// Approve the request this payment pays for, or enroll directly when
    /// there is none.
    async fn settle_enrollment<C: ConnectionTrait>(
        &self,
        conn: &C,
        admin_id: &str,
        verification: &mut PaymentVerification,
        events: &mut Vec<DomainEvent>,
    ) -> AppResult<()> {
        let payment = &verification.payment;

        let linked = match payment.enrollment_request_id.as_deref() {
            Some(request_id) => self
                .request_repo
                .find_by_id(conn, request_id)
                .await?
                .filter(|r| {
                    r.status.is_active()
                        && r.student_id == payment.student_id
                        && r.course_id == payment.course_id
                }),
            None => None,
        };
        let request = match linked {
            Some(request) => Some(request),
            None => {
                self.request_repo
                    .find_active(conn, &payment.student_id, &payment.course_id)
                    .await?
            }
        };

        let already_enrolled = self
            .enrollment_repo
            .is_enrolled(conn, &payment.student_id, &payment.course_id)
            .await?;

        match request {
            Some(request) if already_enrolled => {
                let rejected = self
                    .requests
                    .reject_in(conn, request, admin_id, REASON_ALREADY_ENROLLED)
                    .await?;
                events.push(rejected_event(&rejected));
                verification.enrollment_request = Some(rejected);
            }
            Some(request) => {
                let approval = self
                    .requests
                    .approve_in(conn, request, Some(admin_id))
                    .await?;
                events.push(DomainEvent::EnrollmentApproved {
                    request_id: approval.request.id.clone(),
                });
                verification.enrollment_request = Some(approval.request);
                verification.enrollment = Some(approval.enrollment);
            }
            None if already_enrolled => {}
            None => {
                let student_id = payment.student_id.clone();
                let course_id = payment.course_id.clone();
                verification.enrollment = Some(
                    self.requests
                        .enroll_in(conn, &student_id, &course_id, None)
                        .await?,
                );
            }
        }

        Ok(())
    }

    /// Reject a pending payment.
    pub async fn reject(
        &self,
        payment_id: &str,
        admin_id: &str,
        reason: &str,
    ) -> AppResult<payment::Model> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let current = self.load(&txn, payment_id).await?;
        if current.status != PaymentStatus::Pending {
            return Err(not_pending(current.status, "reject"));
        }

        let mut active: payment::ActiveModel = current.into();
        active.status = Set(PaymentStatus::Rejected);
        active.admin_notes = Set(Some(reason.to_string()));
        active.updated_at = Set(Some(Utc::now().into()));
        let rejected = self.settle(&txn, payment_id, active, "reject").await?;

        txn.commit().await.map_err(map_db_err)?;

        Metrics::incr(&get_metrics().payments_rejected);
        info!(
            payment_reference = %rejected.payment_reference,
            admin_id = %admin_id,
            reason,
            "Payment rejected"
        );
        dispatch(
            self.event_sink.as_ref(),
            vec![DomainEvent::PaymentRejected {
                payment_id: rejected.id.clone(),
                reason: reason.to_string(),
            }],
        )
        .await;

        Ok(rejected)
    }

    async fn settle<C: ConnectionTrait>(
        &self,
        conn: &C,
        payment_id: &str,
        active: payment::ActiveModel,
        action: &str,
    ) -> AppResult<payment::Model> {
        self.payment_repo
            .settle_pending(conn, payment_id, active)
            .await?
            .ok_or_else(|| {
                AppError::InvalidState(format!(
                    "Cannot {action} a payment that was settled concurrently"
                ))
            })
    }

    async fn load<C: ConnectionTrait>(&self, conn: &C, payment_id: &str) -> AppResult<payment::Model> {
        self.payment_repo
            .find_by_id(conn, payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }

    /// Get a payment by ID.
    pub async fn get(&self, payment_id: &str) -> AppResult<payment::Model> {
        self.load(self.db.as_ref(), payment_id).await
    }

    /// Payments in a status (paginated, newest first).
    pub async fn list_by_status(
        &self,
        status: PaymentStatus,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<payment::Model>> {
        self.payment_repo
            .find_by_status(self.db.as_ref(), status, limit, until_id)
            .await
    }

    /// Payments of a student, newest first.
    pub async fn list_for_student(&self, student_id: &str) -> AppResult<Vec<payment::Model>> {
        self.payment_repo
            .find_by_student(self.db.as_ref(), student_id)
            .await
    }
}

fn not_pending(status: PaymentStatus, action: &str) -> AppError {
    let status = match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Verified => "verified",
        PaymentStatus::Rejected => "rejected",
    };
    AppError::InvalidState(format!("Cannot {action} a {status} payment"))
}

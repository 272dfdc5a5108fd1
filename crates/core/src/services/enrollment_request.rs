//! Enrollment request service.
//!
//! Owns the request state machine:
//! `pending -> {parent_notified | payment_pending} -> {approved | rejected | cancelled}`.
//! Approval creates the student's enrollment in the same transaction.

use std::sync::Arc;

use academy_common::{
    AppError, AppResult, CodeKind, IdGenerator, Metrics, config::EnrollmentConfig, get_metrics,
};
use academy_db::{
    entities::{
        Frequency, course,
        enrollment::{self, EnrollmentStatus},
        enrollment_request::{self, RequestStatus, RoutingPath, active_key},
        student::{self, StudentStatus},
    },
    map_db_err,
    repositories::{
        CourseRepository, EnrollmentRepository, EnrollmentRequestRepository, GuardianRepository,
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
use crate::services::event_sink::{DomainEvent, EventSinkService, dispatch};
use crate::services::parent_provisioning::{
    GuardianInfo, ParentProvisioningService, ProvisioningOutcome,
};
use crate::services::routing::{RoutingInput, RoutingPolicy, age_on};

/// Rejection reason recorded when the student already holds a seat.
pub const REASON_ALREADY_ENROLLED: &str = "Student is already enrolled in this course";

/// Input for creating an enrollment request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestInput {
    pub frequency: Frequency,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

/// An approved request together with the enrollment it produced.
#[derive(Debug, Clone)]
pub struct Approval {
    pub request: enrollment_request::Model,
    pub enrollment: enrollment::Model,
}

/// A request moved to `parent_notified` after provisioning its guardian.
#[derive(Debug, Clone)]
pub struct GuardianNotification {
    pub request: enrollment_request::Model,
    pub outcome: ProvisioningOutcome,
}

/// Enrollment request service.
#[derive(Clone)]
pub struct EnrollmentRequestService {
    db: Arc<DatabaseConnection>,
    codes: CodeGenerator,
    id_gen: IdGenerator,
    routing: RoutingPolicy,
    default_price_3x_weekly: Decimal,
    default_price_5x_weekly: Decimal,
    provisioning: ParentProvisioningService,
    request_repo: EnrollmentRequestRepository,
    enrollment_repo: EnrollmentRepository,
    student_repo: StudentRepository,
    course_repo: CourseRepository,
    guardian_repo: GuardianRepository,
    event_sink: Option<EventSinkService>,
}

impl EnrollmentRequestService {
    /// Create a new enrollment request service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &EnrollmentConfig,
        id_gen: IdGenerator,
        provisioning: ParentProvisioningService,
    ) -> Self {
        Self {
            db,
            codes: CodeGenerator::new(id_gen.clone(), config.code_retry_cap),
            id_gen,
            routing: RoutingPolicy::new(config.adult_age),
            default_price_3x_weekly: config.default_price_3x_weekly,
            default_price_5x_weekly: config.default_price_5x_weekly,
            provisioning,
            request_repo: EnrollmentRequestRepository::new(),
            enrollment_repo: EnrollmentRepository::new(),
            student_repo: StudentRepository::new(),
            course_repo: CourseRepository::new(),
            guardian_repo: GuardianRepository::new(),
            event_sink: None,
        }
    }

    /// Set the event sink for workflow notifications.
    pub fn set_event_sink(&mut self, event_sink: EventSinkService) {
        self.event_sink = Some(event_sink);
    }

    /// Price quoted for a course at a frequency, falling back to the
    /// configured default when the course has none.
    #[must_use]
    pub fn quote(&self, course: &course::Model, frequency: Frequency) -> Decimal {
        course.price_for(frequency).unwrap_or(match frequency {
            Frequency::ThreeWeekly => self.default_price_3x_weekly,
            Frequency::FiveWeekly => self.default_price_5x_weekly,
        })
    }

    /// Create a request in `pending`.
    pub async fn create(
        &self,
        student_id: &str,
        course_id: &str,
        input: CreateRequestInput,
    ) -> AppResult<enrollment_request::Model> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let student = self
            .student_repo
            .find_by_id(&txn, student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
        let course = self
            .course_repo
            .find_by_id(&txn, course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        if let Some(level_id) = course.academic_level_id.as_deref()
            && student.academic_level_id.as_deref() != Some(level_id)
        {
            return Err(AppError::Validation(
                "Course is restricted to another academic level".to_string(),
            ));
        }

        if self
            .request_repo
            .find_active(&txn, student_id, course_id)
            .await?
            .is_some()
        {
            return Err(active_request_conflict());
        }

        let quoted_price = self.quote(&course, input.frequency);
        let message = input
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        let now = Utc::now();

        let request = self
            .codes
            .insert_with_code(&txn, CodeKind::EnrollmentRequest, "request_code", |code| {
                enrollment_request::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    request_code: Set(code),
                    student_id: Set(student_id.to_string()),
                    course_id: Set(course_id.to_string()),
                    frequency: Set(input.frequency),
                    quoted_price: Set(quoted_price),
                    message: Set(message.clone()),
                    status: Set(RequestStatus::Pending),
                    routing_path: Set(None),
                    rejection_reason: Set(None),
                    enrollment_id: Set(None),
                    reviewed_by: Set(None),
                    reviewed_at: Set(None),
                    active_key: Set(Some(active_key(student_id, course_id))),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                }
            })
            .await
            .map_err(|e| {
                if e.is_conflict_on("active_key") {
                    active_request_conflict()
                } else {
                    e
                }
            })?;

        txn.commit().await.map_err(map_db_err)?;

        Metrics::incr(&get_metrics().enrollment_requests_created);
        info!(
            request_code = %request.request_code,
            student_id = %student_id,
            course_id = %course_id,
            "Created enrollment request"
        );

        Ok(request)
    }

    /// Route a pending request and move it to the matching state.
    pub async fn notify(&self, request_id: &str) -> AppResult<enrollment_request::Model> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let request = self.load(&txn, request_id).await?;
        if request.status != RequestStatus::Pending {
            return Err(invalid_transition(request.status, "notify"));
        }
        if request.routing_path.is_some() {
            return Err(AppError::InvalidState(
                "Enrollment request has already been routed".to_string(),
            ));
        }

        let student = self
            .student_repo
            .find_by_id(&txn, &request.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
        let path = self.routing.route(&self.routing_input(&txn, &student).await?);

        let (status, event) = match path {
            RoutingPath::ParentPayment => (
                RequestStatus::ParentNotified,
                Some(DomainEvent::EnrollmentRequestCreated {
                    request_id: request.id.clone(),
                }),
            ),
            RoutingPath::StudentPayment => (
                RequestStatus::PaymentPending,
                Some(DomainEvent::PaymentRequired {
                    request_id: request.id.clone(),
                }),
            ),
            RoutingPath::ParentRegistration => (RequestStatus::Pending, None),
            RoutingPath::AdminReview => (
                RequestStatus::Pending,
                Some(DomainEvent::AdminReviewRequired {
                    request_id: request.id.clone(),
                }),
            ),
        };

        let mut active: enrollment_request::ActiveModel = request.into();
        active.routing_path = Set(Some(path));
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self
            .transition(&txn, request_id, &[RequestStatus::Pending], active, "notify")
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        info!(
            request_code = %updated.request_code,
            path = ?path,
            status = updated.status.as_str(),
            "Routed enrollment request"
        );
        dispatch(self.event_sink.as_ref(), event.into_iter().collect()).await;

        Ok(updated)
    }

    async fn routing_input<C: ConnectionTrait>(
        &self,
        conn: &C,
        student: &student::Model,
    ) -> AppResult<RoutingInput> {
        let links = self
            .guardian_repo
            .find_links_for_student(conn, &student.id)
            .await?;
        let today = Utc::now().date_naive();

        Ok(RoutingInput {
            has_confirmed_guardian: links.iter().any(|l| l.is_confirmed),
            has_linked_guardian: !links.is_empty(),
            age: student.date_of_birth.and_then(|dob| age_on(dob, today)),
            requires_guardian: student.requires_guardian,
        })
    }

    /// Provision the guardian for a request routed to parent registration,
    /// then move it to `parent_notified` in the same transaction.
    pub async fn create_guardian_and_notify(
        &self,
        request_id: &str,
        info: GuardianInfo,
    ) -> AppResult<GuardianNotification> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let request = self.load(&txn, request_id).await?;
        if request.status != RequestStatus::Pending
            || request.routing_path != Some(RoutingPath::ParentRegistration)
        {
            return Err(AppError::InvalidState(
                "Enrollment request is not awaiting parent registration".to_string(),
            ));
        }

        let outcome = self
            .provisioning
            .provision(&txn, &request.student_id, &request.id, info)
            .await?;

        let mut active: enrollment_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::ParentNotified);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self
            .transition(&txn, request_id, &[RequestStatus::Pending], active, "notify")
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        info!(
            request_code = %updated.request_code,
            guardian_id = %outcome.guardian_id(),
            "Guardian provisioned, parent notified"
        );

        let mut events = outcome.events();
        events.push(DomainEvent::EnrollmentRequestCreated {
            request_id: updated.id.clone(),
        });
        dispatch(self.event_sink.as_ref(), events).await;

        Ok(GuardianNotification {
            request: updated,
            outcome,
        })
    }

    /// Approve an active request and create the enrollment.
    ///
    /// If the student already holds a seat in the course, the request is
    /// rejected (and that rejection committed) before returning
    /// [`AppError::Conflict`].
    pub async fn approve(&self, request_id: &str, admin_id: &str) -> AppResult<Approval> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let request = self.load(&txn, request_id).await?;
        if !request.status.is_active() {
            return Err(invalid_transition(request.status, "approve"));
        }

        if self
            .enrollment_repo
            .is_enrolled(&txn, &request.student_id, &request.course_id)
            .await?
        {
            let rejected = self
                .reject_in(&txn, request, admin_id, REASON_ALREADY_ENROLLED)
                .await?;
            txn.commit().await.map_err(map_db_err)?;

            dispatch(self.event_sink.as_ref(), vec![rejected_event(&rejected)]).await;
            return Err(AppError::Conflict(REASON_ALREADY_ENROLLED.to_string()));
        }

        let approval = self.approve_in(&txn, request, Some(admin_id)).await?;
        txn.commit().await.map_err(map_db_err)?;

        dispatch(
            self.event_sink.as_ref(),
            vec![DomainEvent::EnrollmentApproved {
                request_id: approval.request.id.clone(),
            }],
        )
        .await;

        Ok(approval)
    }

    /// Reject an active request.
    pub async fn reject(
        &self,
        request_id: &str,
        admin_id: &str,
        reason: &str,
    ) -> AppResult<enrollment_request::Model> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let request = self.load(&txn, request_id).await?;
        if !request.status.is_active() {
            return Err(invalid_transition(request.status, "reject"));
        }

        let rejected = self.reject_in(&txn, request, admin_id, reason).await?;
        txn.commit().await.map_err(map_db_err)?;

        dispatch(self.event_sink.as_ref(), vec![rejected_event(&rejected)]).await;
        Ok(rejected)
    }

    /// Cancel an active request.
    pub async fn cancel(
        &self,
        request_id: &str,
        actor_id: &str,
    ) -> AppResult<enrollment_request::Model> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let request = self.load(&txn, request_id).await?;
        if !request.status.is_active() {
            return Err(invalid_transition(request.status, "cancel"));
        }

        let mut active: enrollment_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Cancelled);
        active.active_key = Set(None);
        active.updated_at = Set(Some(Utc::now().into()));
        let cancelled = self
            .transition(&txn, request_id, &RequestStatus::ACTIVE, active, "cancel")
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        Metrics::incr(&get_metrics().enrollment_requests_cancelled);
        info!(request_code = %cancelled.request_code, actor_id = %actor_id, "Cancelled enrollment request");
        dispatch(
            self.event_sink.as_ref(),
            vec![DomainEvent::EnrollmentCancelled {
                request_id: cancelled.id.clone(),
            }],
        )
        .await;

        Ok(cancelled)
    }

    /// Create the enrollment and mark the request approved, inside the
    /// caller's transaction. The caller has checked the request is active
    /// and that the student is not already enrolled.
    pub(crate) async fn approve_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: enrollment_request::Model,
        reviewer: Option<&str>,
    ) -> AppResult<Approval> {
        let enrollment = self
            .enroll_in(
                conn,
                &request.student_id,
                &request.course_id,
                Some(&request.id),
            )
            .await?;

        let request_id = request.id.clone();
        let mut active: enrollment_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Approved);
        active.enrollment_id = Set(Some(enrollment.id.clone()));
        active.reviewed_by = Set(reviewer.map(str::to_string));
        active.reviewed_at = Set(Some(Utc::now().into()));
        active.active_key = Set(None);
        active.updated_at = Set(Some(Utc::now().into()));
        let approved = self
            .transition(conn, &request_id, &RequestStatus::ACTIVE, active, "approve")
            .await?;

        Metrics::incr(&get_metrics().enrollment_requests_approved);
        info!(
            request_code = %approved.request_code,
            enrollment_id = %enrollment.id,
            "Approved enrollment request"
        );

        Ok(Approval {
            request: approved,
            enrollment,
        })
    }

    /// Mark an active request rejected inside the caller's transaction.
    pub(crate) async fn reject_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: enrollment_request::Model,
        reviewer: &str,
        reason: &str,
    ) -> AppResult<enrollment_request::Model> {
        let now = Utc::now();
        let request_id = request.id.clone();
        let mut active: enrollment_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Rejected);
        active.rejection_reason = Set(Some(reason.to_string()));
        active.reviewed_by = Set(Some(reviewer.to_string()));
        active.reviewed_at = Set(Some(now.into()));
        active.active_key = Set(None);
        active.updated_at = Set(Some(now.into()));
        let rejected = self
            .transition(conn, &request_id, &RequestStatus::ACTIVE, active, "reject")
            .await?;

        Metrics::incr(&get_metrics().enrollment_requests_rejected);
        info!(request_code = %rejected.request_code, reason, "Rejected enrollment request");
        Ok(rejected)
    }

    /// Create an active enrollment, promoting a prospective student to
    /// enrolled.
    pub(crate) async fn enroll_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        student_id: &str,
        course_id: &str,
        request_id: Option<&str>,
    ) -> AppResult<enrollment::Model> {
        let now = Utc::now();
        let enrollment = self
            .enrollment_repo
            .create(
                conn,
                enrollment::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    student_id: Set(student_id.to_string()),
                    course_id: Set(course_id.to_string()),
                    enrollment_request_id: Set(request_id.map(str::to_string)),
                    status: Set(EnrollmentStatus::Active),
                    progress_percentage: Set(0),
                    notes: Set(None),
                    active_key: Set(Some(active_key(student_id, course_id))),
                    enrolled_at: Set(now.into()),
                    completed_at: Set(None),
                    updated_at: Set(None),
                },
            )
            .await
            .map_err(|e| {
                if e.is_conflict_on("active_key") {
                    AppError::Conflict(REASON_ALREADY_ENROLLED.to_string())
                } else {
                    e
                }
            })?;

        if let Some(student) = self.student_repo.find_by_id(conn, student_id).await?
            && student.enrollment_status == StudentStatus::Prospective
        {
            let mut active: student::ActiveModel = student.into();
            active.enrollment_status = Set(StudentStatus::Enrolled);
            active.updated_at = Set(Some(now.into()));
            self.student_repo.update(conn, active).await?;
        }

        Ok(enrollment)
    }

    /// Write a transition guarded on the status read earlier in this
    /// transaction, so a concurrent transition cannot be overwritten.
    async fn transition<C: ConnectionTrait>(
        &self,
        conn: &C,
        request_id: &str,
        expected: &[RequestStatus],
        active: enrollment_request::ActiveModel,
        action: &str,
    ) -> AppResult<enrollment_request::Model> {
        self.request_repo
            .update_if_status(conn, request_id, expected, active)
            .await?
            .ok_or_else(|| {
                AppError::InvalidState(format!(
                    "Cannot {action} an enrollment request that changed status concurrently"
                ))
            })
    }

    async fn load<C: ConnectionTrait>(
        &self,
        conn: &C,
        request_id: &str,
    ) -> AppResult<enrollment_request::Model> {
        self.request_repo
            .find_by_id(conn, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Enrollment request not found".to_string()))
    }

    // ==================== Queries ====================

    /// Get a request by ID.
    pub async fn get(&self, request_id: &str) -> AppResult<enrollment_request::Model> {
        self.load(self.db.as_ref(), request_id).await
    }

    /// Get a request by its business code.
    pub async fn get_by_code(&self, code: &str) -> AppResult<enrollment_request::Model> {
        self.request_repo
            .find_by_code(self.db.as_ref(), code)
            .await?
            .ok_or_else(|| AppError::NotFound("Enrollment request not found".to_string()))
    }

    /// Requests of a student, newest first.
    pub async fn list_for_student(
        &self,
        student_id: &str,
    ) -> AppResult<Vec<enrollment_request::Model>> {
        self.request_repo
            .find_by_student(self.db.as_ref(), student_id)
            .await
    }

    /// Requests in a status (paginated, newest first).
    pub async fn list_by_status(
        &self,
        status: RequestStatus,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<enrollment_request::Model>> {
        self.request_repo
            .find_by_status(self.db.as_ref(), status, limit, until_id)
            .await
    }

    /// Count requests in a status.
    pub async fn count_by_status(&self, status: RequestStatus) -> AppResult<u64> {
        self.request_repo
            .count_by_status(self.db.as_ref(), status)
            .await
    }
}

pub(crate) fn rejected_event(request: &enrollment_request::Model) -> DomainEvent {
    DomainEvent::EnrollmentRejected {
        request_id: request.id.clone(),
        reason: request.rejection_reason.clone().unwrap_or_default(),
    }
}

fn active_request_conflict() -> AppError {
    AppError::Conflict(
        "An active enrollment request already exists for this course".to_string(),
    )
}

fn invalid_transition(status: RequestStatus, action: &str) -> AppError {
    AppError::InvalidState(format!(
        "Cannot {action} an enrollment request in status {}",
        status.as_str()
    ))
}

//! Student promotion service.

use std::sync::Arc;

use academy_common::{
    AppError, AppResult, CodeKind, IdGenerator, Metrics, config::EnrollmentConfig, get_metrics,
};
use academy_db::{
    entities::{
        enrollment::{self, EnrollmentStatus},
        student,
        student_promotion::{self, PromotionStatus, PromotionType},
    },
    map_db_err,
    repositories::{
        AcademicLevelRepository, CourseRepository, EnrollmentRepository, StudentPromotionRepository,
        StudentRepository,
    },
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::services::codes::CodeGenerator;
use crate::services::event_sink::{DomainEvent, EventSinkService, dispatch};

/// Input for proposing a promotion.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromotionInput {
    pub student_id: String,
    pub to_level_id: String,
    #[serde(default = "default_promotion_type")]
    pub promotion_type: PromotionType,
    #[serde(default)]
    pub auto_update_enrollments: bool,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

const fn default_promotion_type() -> PromotionType {
    PromotionType::Regular
}

/// A completed promotion and the enrollments it closed.
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    pub promotion: student_promotion::Model,
    pub completed_enrollments: Vec<enrollment::Model>,
}

/// Student promotion service.
#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DatabaseConnection>,
    codes: CodeGenerator,
    id_gen: IdGenerator,
    promotion_repo: StudentPromotionRepository,
    student_repo: StudentRepository,
    level_repo: AcademicLevelRepository,
    enrollment_repo: EnrollmentRepository,
    course_repo: CourseRepository,
    event_sink: Option<EventSinkService>,
}

impl PromotionService {
    /// Create a new promotion service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &EnrollmentConfig, id_gen: IdGenerator) -> Self {
        Self {
            db,
            codes: CodeGenerator::new(id_gen.clone(), config.code_retry_cap),
            id_gen,
            promotion_repo: StudentPromotionRepository::new(),
            student_repo: StudentRepository::new(),
            level_repo: AcademicLevelRepository::new(),
            enrollment_repo: EnrollmentRepository::new(),
            course_repo: CourseRepository::new(),
            event_sink: None,
        }
    }

    /// Set the event sink for workflow notifications.
    pub fn set_event_sink(&mut self, event_sink: EventSinkService) {
        self.event_sink = Some(event_sink);
    }

    /// Propose a promotion in `pending`.
    pub async fn create(
        &self,
        input: CreatePromotionInput,
        promoted_by: &str,
    ) -> AppResult<student_promotion::Model> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let student = self
            .student_repo
            .find_by_id(&txn, &input.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
        self.level_repo
            .find_by_id(&txn, &input.to_level_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Academic level not found".to_string()))?;

        if self
            .promotion_repo
            .find_pending_for_student(&txn, &student.id)
            .await?
            .is_some()
        {
            return Err(pending_exists());
        }

        if input.promotion_type == PromotionType::Regular
            && student.academic_level_id.as_deref() == Some(input.to_level_id.as_str())
        {
            return Err(AppError::Validation(
                "Student is already at the target level".to_string(),
            ));
        }

        let now = Utc::now();
        let promotion = self
            .codes
            .insert_with_code(&txn, CodeKind::Promotion, "promotion_code", |code| {
                student_promotion::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    promotion_code: Set(code),
                    student_id: Set(student.id.clone()),
                    from_level_id: Set(student.academic_level_id.clone()),
                    to_level_id: Set(input.to_level_id.clone()),
                    promotion_type: Set(input.promotion_type),
                    status: Set(PromotionStatus::Pending),
                    auto_update_enrollments: Set(input.auto_update_enrollments),
                    promoted_by: Set(promoted_by.to_string()),
                    reviewed_by: Set(None),
                    notes: Set(input.notes.clone()),
                    rejection_reason: Set(None),
                    pending_key: Set(Some(student.id.clone())),
                    created_at: Set(now.into()),
                    reviewed_at: Set(None),
                    completed_at: Set(None),
                }
            })
            .await
            .map_err(|e| {
                if e.is_conflict_on("pending_key") {
                    pending_exists()
                } else {
                    e
                }
            })?;

        txn.commit().await.map_err(map_db_err)?;

        info!(
            promotion_code = %promotion.promotion_code,
            student_id = %promotion.student_id,
            to_level_id = %promotion.to_level_id,
            "Promotion proposed"
        );
        Ok(promotion)
    }

    /// Approve and execute a pending promotion as one atomic unit.
    ///
    /// Only one of several concurrent approvals succeeds; the rest fail with
    /// [`AppError::InvalidState`] and change nothing.
    pub async fn approve(&self, promotion_id: &str, admin_id: &str) -> AppResult<PromotionOutcome> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let now = Utc::now();

        let current = self.load(&txn, promotion_id).await?;
        if !self
            .promotion_repo
            .close_pending(
                &txn,
                &current.id,
                PromotionStatus::Approved,
                admin_id,
                None,
                now.into(),
            )
            .await?
        {
            return Err(AppError::InvalidState(
                "Promotion is no longer pending".to_string(),
            ));
        }

        let approved = self.load(&txn, promotion_id).await?;
        let outcome = self.execute(&txn, approved).await?;

        txn.commit().await.map_err(map_db_err)?;

        Metrics::incr(&get_metrics().promotions_completed);
        info!(
            promotion_code = %outcome.promotion.promotion_code,
            admin_id = %admin_id,
            completed_enrollments = outcome.completed_enrollments.len(),
            "Promotion completed"
        );
        dispatch(
            self.event_sink.as_ref(),
            vec![DomainEvent::StudentPromoted {
                promotion_id: outcome.promotion.id.clone(),
            }],
        )
        .await;

        Ok(outcome)
    }

    /// Move the student to the target level and close out enrollments the
    /// new level no longer qualifies for.
    async fn execute<C: ConnectionTrait>(
        &self,
        conn: &C,
        promotion: student_promotion::Model,
    ) -> AppResult<PromotionOutcome> {
        let now = Utc::now();

        let student = self
            .student_repo
            .find_by_id(conn, &promotion.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
        let mut active_student: student::ActiveModel = student.into();
        active_student.academic_level_id = Set(Some(promotion.to_level_id.clone()));
        active_student.updated_at = Set(Some(now.into()));
        self.student_repo.update(conn, active_student).await?;

        let mut completed_enrollments = Vec::new();
        if promotion.auto_update_enrollments {
            let level_name = self
                .level_repo
                .find_by_id(conn, &promotion.to_level_id)
                .await?
                .map_or_else(|| promotion.to_level_id.clone(), |l| l.name);

            for current in self
                .enrollment_repo
                .find_active_for_student(conn, &promotion.student_id)
                .await?
            {
                let Some(course) = self.course_repo.find_by_id(conn, &current.course_id).await?
                else {
                    continue;
                };
                let mismatched = course
                    .academic_level_id
                    .as_deref()
                    .is_some_and(|level| level != promotion.to_level_id);
                if !mismatched {
                    continue;
                }

                let note = format!(
                    "Completed by promotion {} to {level_name}",
                    promotion.promotion_code
                );
                let notes = match current.notes.as_deref() {
                    Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
                    _ => note,
                };

                let mut active: enrollment::ActiveModel = current.into();
                active.status = Set(EnrollmentStatus::Completed);
                active.notes = Set(Some(notes));
                active.completed_at = Set(Some(now.into()));
                active.active_key = Set(None);
                active.updated_at = Set(Some(now.into()));
                completed_enrollments.push(self.enrollment_repo.update(conn, active).await?);
            }
        }

        let mut active: student_promotion::ActiveModel = promotion.into();
        active.status = Set(PromotionStatus::Completed);
        active.completed_at = Set(Some(now.into()));
        let promotion = self.promotion_repo.update(conn, active).await?;

        Ok(PromotionOutcome {
            promotion,
            completed_enrollments,
        })
    }

    /// Reject a pending promotion.
    pub async fn reject(
        &self,
        promotion_id: &str,
        admin_id: &str,
        reason: &str,
    ) -> AppResult<student_promotion::Model> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let current = self.load(&txn, promotion_id).await?;
        if !self
            .promotion_repo
            .close_pending(
                &txn,
                &current.id,
                PromotionStatus::Rejected,
                admin_id,
                Some(reason.to_string()),
                Utc::now().into(),
            )
            .await?
        {
            return Err(AppError::InvalidState(
                "Promotion is no longer pending".to_string(),
            ));
        }

        let rejected = self.load(&txn, promotion_id).await?;
        txn.commit().await.map_err(map_db_err)?;

        info!(promotion_code = %rejected.promotion_code, admin_id = %admin_id, "Promotion rejected");
        Ok(rejected)
    }

    async fn load<C: ConnectionTrait>(
        &self,
        conn: &C,
        promotion_id: &str,
    ) -> AppResult<student_promotion::Model> {
        self.promotion_repo
            .find_by_id(conn, promotion_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Promotion not found".to_string()))
    }

    /// Get a promotion by ID.
    pub async fn get(&self, promotion_id: &str) -> AppResult<student_promotion::Model> {
        self.load(self.db.as_ref(), promotion_id).await
    }

    /// Promotions of a student, newest first.
    pub async fn list_for_student(
        &self,
        student_id: &str,
    ) -> AppResult<Vec<student_promotion::Model>> {
        self.promotion_repo
            .find_by_student(self.db.as_ref(), student_id)
            .await
    }
}

fn pending_exists() -> AppError {
    AppError::Validation("Student already has a pending promotion".to_string())
}

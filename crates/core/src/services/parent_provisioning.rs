//! Parent provisioning service.
//!
//! Creates or links a guardian account for a student whose enrollment needs
//! a parent to act, and drives the provisioned account's first login.

use std::fmt;
use std::sync::Arc;

use academy_common::{
    AppError, AppResult, CodeKind, IdGenerator, Metrics, config::EnrollmentConfig, get_metrics,
};
use academy_db::{
    entities::{
        account::{self, AccountRole},
        guardian, guardian_student,
        guardian_student::RelationshipKind,
        parent_registration::{self, RegistrationStatus},
    },
    map_db_err,
    repositories::{
        AccountRepository, EnrollmentRequestRepository, GuardianRepository,
        ParentRegistrationRepository, StudentRepository,
    },
};
use chrono::{Duration, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::services::codes::CodeGenerator;
use crate::services::event_sink::{DomainEvent, EventSinkService, dispatch};
use crate::services::password::{MIN_PASSWORD_LEN, hash_password, verify_password};

/// Guardian details supplied on the student's behalf.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuardianInfo {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(length(max = 64))]
    pub phone: Option<String>,
    #[serde(default)]
    pub relationship_kind: RelationshipKind,
}

/// Result of provisioning a guardian for a student.
#[derive(Clone)]
pub enum ProvisioningOutcome {
    /// A new guardian account was created.
    Registered {
        registration: parent_registration::Model,
        guardian_id: String,
        temporary_password: String,
    },
    /// An existing guardian account was used.
    Linked {
        guardian_id: String,
        student_id: String,
        link_created: bool,
    },
}

impl ProvisioningOutcome {
    /// Guardian that now represents the student.
    #[must_use]
    pub fn guardian_id(&self) -> &str {
        match self {
            Self::Registered { guardian_id, .. } | Self::Linked { guardian_id, .. } => guardian_id,
        }
    }

    /// Registration record, when a new account was created.
    #[must_use]
    pub const fn registration(&self) -> Option<&parent_registration::Model> {
        match self {
            Self::Registered { registration, .. } => Some(registration),
            Self::Linked { .. } => None,
        }
    }

    pub(crate) fn events(&self) -> Vec<DomainEvent> {
        match self {
            Self::Registered {
                registration,
                guardian_id,
                temporary_password,
            } => vec![DomainEvent::GuardianWelcome {
                registration_id: registration.id.clone(),
                guardian_id: guardian_id.clone(),
                email: registration.guardian_email.clone(),
                temporary_password: temporary_password.clone(),
            }],
            Self::Linked {
                guardian_id,
                student_id,
                link_created: true,
            } => vec![DomainEvent::GuardianLinked {
                guardian_id: guardian_id.clone(),
                student_id: student_id.clone(),
            }],
            Self::Linked { .. } => Vec::new(),
        }
    }
}

impl fmt::Debug for ProvisioningOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered {
                registration,
                guardian_id,
                ..
            } => f
                .debug_struct("Registered")
                .field("registration_id", &registration.id)
                .field("guardian_id", guardian_id)
                .finish_non_exhaustive(),
            Self::Linked {
                guardian_id,
                student_id,
                link_created,
            } => f
                .debug_struct("Linked")
                .field("guardian_id", guardian_id)
                .field("student_id", student_id)
                .field("link_created", link_created)
                .finish(),
        }
    }
}

/// Parent provisioning service.
#[derive(Clone)]
pub struct ParentProvisioningService {
    db: Arc<DatabaseConnection>,
    codes: CodeGenerator,
    id_gen: IdGenerator,
    registration_expiry_days: i64,
    account_repo: AccountRepository,
    guardian_repo: GuardianRepository,
    student_repo: StudentRepository,
    request_repo: EnrollmentRequestRepository,
    registration_repo: ParentRegistrationRepository,
    event_sink: Option<EventSinkService>,
}

impl ParentProvisioningService {
    /// Create a new parent provisioning service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &EnrollmentConfig,
        id_gen: IdGenerator,
    ) -> Self {
        Self {
            db,
            codes: CodeGenerator::new(id_gen.clone(), config.code_retry_cap),
            id_gen,
            registration_expiry_days: config.registration_expiry_days,
            account_repo: AccountRepository::new(),
            guardian_repo: GuardianRepository::new(),
            student_repo: StudentRepository::new(),
            request_repo: EnrollmentRequestRepository::new(),
            registration_repo: ParentRegistrationRepository::new(),
            event_sink: None,
        }
    }

    /// Set the event sink for workflow notifications.
    pub fn set_event_sink(&mut self, event_sink: EventSinkService) {
        self.event_sink = Some(event_sink);
    }

    /// Create or link a guardian for a student, idempotent on email.
    pub async fn create_from_info(
        &self,
        student_id: &str,
        request_id: &str,
        info: GuardianInfo,
    ) -> AppResult<ProvisioningOutcome> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let request = self
            .request_repo
            .find_by_id(&txn, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Enrollment request not found".to_string()))?;
        if request.student_id != student_id {
            return Err(AppError::Validation(
                "Enrollment request belongs to another student".to_string(),
            ));
        }

        let outcome = self.provision(&txn, student_id, request_id, info).await?;
        txn.commit().await.map_err(map_db_err)?;

        dispatch(self.event_sink.as_ref(), outcome.events()).await;
        Ok(outcome)
    }

    /// Provision inside the caller's transaction. Events are returned, not sent.
    pub(crate) async fn provision<C>(
        &self,
        conn: &C,
        student_id: &str,
        request_id: &str,
        info: GuardianInfo,
    ) -> AppResult<ProvisioningOutcome>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        info.validate()?;
        let email = info.email.trim().to_lowercase();

        self.student_repo
            .find_by_id(conn, student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        if let Some(existing) = self.account_repo.find_by_email(conn, &email).await? {
            if existing.role != AccountRole::Guardian {
                return Err(AppError::Conflict(format!(
                    "Email {email} belongs to a {} account",
                    match existing.role {
                        AccountRole::Student => "student",
                        AccountRole::Guardian => "guardian",
                        AccountRole::Admin => "admin",
                    }
                )));
            }
            return self.link_existing(conn, &existing, student_id, &info).await;
        }

        let now = Utc::now();
        let temporary_password = self.id_gen.generate_temporary_password();
        let password_hash = hash_password(&temporary_password)?;

        let account = self
            .account_repo
            .create(
                conn,
                account::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    email: Set(email.clone()),
                    name: Set(info.name.trim().to_string()),
                    role: Set(AccountRole::Guardian),
                    password_hash: Set(Some(password_hash.clone())),
                    must_change_password: Set(true),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                },
            )
            .await?;

        let guardian = self
            .guardian_repo
            .create(
                conn,
                guardian::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    account_id: Set(account.id),
                    phone: Set(info.phone.clone()),
                    created_at: Set(now.into()),
                },
            )
            .await?;

        self.create_link(conn, &guardian.id, student_id, info.relationship_kind)
            .await?;

        let expires_at: DateTimeWithTimeZone =
            (now + Duration::days(self.registration_expiry_days)).into();
        let registration = self
            .codes
            .insert_with_code(
                conn,
                CodeKind::ParentRegistration,
                "registration_code",
                |code| parent_registration::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    registration_code: Set(code),
                    student_id: Set(student_id.to_string()),
                    enrollment_request_id: Set(request_id.to_string()),
                    guardian_email: Set(email.clone()),
                    temporary_password_hash: Set(password_hash.clone()),
                    status: Set(RegistrationStatus::Pending),
                    expires_at: Set(expires_at),
                    created_guardian_id: Set(Some(guardian.id.clone())),
                    completed_at: Set(None),
                    created_at: Set(now.into()),
                },
            )
            .await?;

        Metrics::incr(&get_metrics().guardians_provisioned);
        info!(
            student_id = %student_id,
            guardian_id = %guardian.id,
            registration_code = %registration.registration_code,
            "Provisioned guardian account"
        );

        Ok(ProvisioningOutcome::Registered {
            registration,
            guardian_id: guardian.id,
            temporary_password,
        })
    }

    async fn link_existing<C: ConnectionTrait>(
        &self,
        conn: &C,
        existing: &account::Model,
        student_id: &str,
        info: &GuardianInfo,
    ) -> AppResult<ProvisioningOutcome> {
        let guardian = match self
            .guardian_repo
            .find_by_account_id(conn, &existing.id)
            .await?
        {
            Some(guardian) => guardian,
            None => {
                self.guardian_repo
                    .create(
                        conn,
                        guardian::ActiveModel {
                            id: Set(self.id_gen.generate()),
                            account_id: Set(existing.id.clone()),
                            phone: Set(info.phone.clone()),
                            created_at: Set(Utc::now().into()),
                        },
                    )
                    .await?
            }
        };

        let already_linked = self
            .guardian_repo
            .find_link(conn, &guardian.id, student_id)
            .await?
            .is_some();

        if !already_linked {
            self.create_link(conn, &guardian.id, student_id, info.relationship_kind)
                .await?;
            info!(student_id = %student_id, guardian_id = %guardian.id, "Linked existing guardian");
        }

        Ok(ProvisioningOutcome::Linked {
            guardian_id: guardian.id,
            student_id: student_id.to_string(),
            link_created: !already_linked,
        })
    }

    async fn create_link<C: ConnectionTrait>(
        &self,
        conn: &C,
        guardian_id: &str,
        student_id: &str,
        relationship_kind: RelationshipKind,
    ) -> AppResult<guardian_student::Model> {
        let is_primary = !self
            .guardian_repo
            .has_primary_guardian(conn, student_id)
            .await?;

        self.guardian_repo
            .create_link(
                conn,
                guardian_student::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    guardian_id: Set(guardian_id.to_string()),
                    student_id: Set(student_id.to_string()),
                    relationship_kind: Set(relationship_kind),
                    is_primary_contact: Set(is_primary),
                    can_view_grades: Set(true),
                    can_view_attendance: Set(true),
                    is_confirmed: Set(false),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await
    }

    /// Complete a registration: swap the temporary password for the
    /// guardian's own and confirm the student link.
    pub async fn complete(
        &self,
        registration_code: &str,
        temporary_password: &str,
        new_password: &str,
    ) -> AppResult<parent_registration::Model> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let registration = self
            .registration_repo
            .find_by_code(&txn, registration_code)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;

        let now = Utc::now();
        match registration.effective_status(now.into()) {
            RegistrationStatus::Pending => {}
            RegistrationStatus::Expired => {
                return Err(AppError::InvalidState("Registration has expired".to_string()));
            }
            RegistrationStatus::Completed => {
                return Err(AppError::InvalidState(
                    "Registration is already completed".to_string(),
                ));
            }
        }

        if !verify_password(temporary_password, &registration.temporary_password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid temporary password".to_string(),
            ));
        }

        let account = self
            .account_repo
            .find_by_email(&txn, &registration.guardian_email)
            .await?
            .ok_or_else(|| AppError::NotFound("Guardian account not found".to_string()))?;

        let mut active_account: account::ActiveModel = account.into();
        active_account.password_hash = Set(Some(hash_password(new_password)?));
        active_account.must_change_password = Set(false);
        active_account.updated_at = Set(Some(now.into()));
        self.account_repo.update(&txn, active_account).await?;

        if let Some(guardian_id) = registration.created_guardian_id.as_deref()
            && let Some(link) = self
                .guardian_repo
                .find_link(&txn, guardian_id, &registration.student_id)
                .await?
        {
            let mut active_link: guardian_student::ActiveModel = link.into();
            active_link.is_confirmed = Set(true);
            self.guardian_repo.update_link(&txn, active_link).await?;
        }

        let mut active: parent_registration::ActiveModel = registration.into();
        active.status = Set(RegistrationStatus::Completed);
        active.completed_at = Set(Some(now.into()));
        let completed = self.registration_repo.update(&txn, active).await?;

        txn.commit().await.map_err(map_db_err)?;

        info!(registration_code = %completed.registration_code, "Parent registration completed");
        Ok(completed)
    }

    /// Persist `expired` for pending registrations past their expiry.
    pub async fn expire_stale(&self, now: DateTimeWithTimeZone) -> AppResult<u64> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let stale = self.registration_repo.find_stale_pending(&txn, now).await?;
        let count = stale.len() as u64;

        for registration in stale {
            let mut active: parent_registration::ActiveModel = registration.into();
            active.status = Set(RegistrationStatus::Expired);
            self.registration_repo.update(&txn, active).await?;
        }

        txn.commit().await.map_err(map_db_err)?;

        if count > 0 {
            info!(count, "Expired stale parent registrations");
        }
        Ok(count)
    }

    /// Get a registration by its code, with the status as observed now.
    pub async fn get_by_code(&self, registration_code: &str) -> AppResult<parent_registration::Model> {
        let mut registration = self
            .registration_repo
            .find_by_code(self.db.as_ref(), registration_code)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;
        registration.status = registration.effective_status(Utc::now().into());
        Ok(registration)
    }
}

//! Shared fixtures for workflow integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use academy_common::{CodeSource, IdGenerator, RandomCodeSource, config::EnrollmentConfig};
use academy_core::{EventSinkService, RecordingEventSink, Workflows};
use academy_db::entities::{
    academic_level,
    account::{self, AccountRole},
    course, guardian,
    guardian_student::{self, RelationshipKind},
    student::{self, StudentStatus},
};
use academy_db::repositories::{
    AcademicLevelRepository, AccountRepository, CourseRepository, GuardianRepository,
    StudentRepository,
};
use academy_db::test_utils::TestDatabase;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set};

/// Code source that replays scripted bodies before falling back to random.
#[derive(Default)]
pub struct ScriptedCodeSource {
    bodies: Mutex<VecDeque<String>>,
}

impl ScriptedCodeSource {
    pub fn new<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bodies: Mutex::new(bodies.into_iter().map(Into::into).collect()),
        }
    }
}

impl CodeSource for ScriptedCodeSource {
    fn next_body(&self, len: usize) -> String {
        self.bodies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomCodeSource.next_body(len))
    }
}

pub struct Harness {
    pub db: Arc<DatabaseConnection>,
    pub workflows: Workflows,
    pub sink: Arc<RecordingEventSink>,
    pub config: EnrollmentConfig,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_id_gen(IdGenerator::new()).await
    }

    pub async fn with_id_gen(id_gen: IdGenerator) -> Self {
        let test_db = TestDatabase::new().await.expect("test database");
        let db = Arc::new(test_db.conn);
        let sink = Arc::new(RecordingEventSink::new());
        let config = EnrollmentConfig::default();
        let event_sink: EventSinkService = sink.clone();
        let workflows = Workflows::new(Arc::clone(&db), &config, id_gen, Some(event_sink));

        Self {
            db,
            workflows,
            sink,
            config,
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.sink.names()
    }

    pub async fn level(&self, name: &str, sort_order: i32) -> String {
        AcademicLevelRepository::new()
            .create(
                self.db.as_ref(),
                academic_level::ActiveModel {
                    id: Set(IdGenerator::new().generate()),
                    name: Set(name.to_string()),
                    sort_order: Set(sort_order),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn account(&self, email: &str, role: AccountRole) -> String {
        AccountRepository::new()
            .create(
                self.db.as_ref(),
                account::ActiveModel {
                    id: Set(IdGenerator::new().generate()),
                    email: Set(email.to_string()),
                    name: Set(email.split('@').next().unwrap_or(email).to_string()),
                    role: Set(role),
                    password_hash: Set(None),
                    must_change_password: Set(false),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                },
            )
            .await
            .unwrap()
            .id
    }

    pub async fn student(
        &self,
        email: &str,
        date_of_birth: Option<NaiveDate>,
        requires_guardian: bool,
        level_id: Option<&str>,
    ) -> String {
        let account_id = self.account(email, AccountRole::Student).await;
        StudentRepository::new()
            .create(
                self.db.as_ref(),
                student::ActiveModel {
                    id: Set(IdGenerator::new().generate()),
                    account_id: Set(account_id),
                    academic_level_id: Set(level_id.map(str::to_string)),
                    date_of_birth: Set(date_of_birth),
                    requires_guardian: Set(requires_guardian),
                    enrollment_status: Set(StudentStatus::Prospective),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                },
            )
            .await
            .unwrap()
            .id
    }

    pub async fn adult_student(&self, email: &str) -> String {
        self.student(email, Some(born_years_ago(30)), true, None).await
    }

    pub async fn minor_student(&self, email: &str) -> String {
        self.student(email, Some(born_years_ago(16)), true, None).await
    }

    pub async fn course(&self, level_id: Option<&str>) -> String {
        CourseRepository::new()
            .create(
                self.db.as_ref(),
                course::ActiveModel {
                    id: Set(IdGenerator::new().generate()),
                    title: Set("Course X".to_string()),
                    academic_level_id: Set(level_id.map(str::to_string)),
                    price_3x_weekly: Set(Some(Decimal::new(80, 0))),
                    price_5x_weekly: Set(Some(Decimal::new(120, 0))),
                    subscription_duration_weeks: Set(4),
                    currency: Set(Some("USD".to_string())),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await
            .unwrap()
            .id
    }

    /// A guardian account linked to the student, confirmed or not.
    pub async fn guardian_for(&self, student_id: &str, email: &str, confirmed: bool) -> String {
        let account_id = self.account(email, AccountRole::Guardian).await;
        let repo = GuardianRepository::new();
        let guardian = repo
            .create(
                self.db.as_ref(),
                guardian::ActiveModel {
                    id: Set(IdGenerator::new().generate()),
                    account_id: Set(account_id),
                    phone: Set(None),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await
            .unwrap();

        repo.create_link(
            self.db.as_ref(),
            guardian_student::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                guardian_id: Set(guardian.id.clone()),
                student_id: Set(student_id.to_string()),
                relationship_kind: Set(RelationshipKind::Mother),
                is_primary_contact: Set(true),
                can_view_grades: Set(true),
                can_view_attendance: Set(true),
                is_confirmed: Set(confirmed),
                created_at: Set(Utc::now().into()),
            },
        )
        .await
        .unwrap();

        guardian.id
    }

    /// A guardian account with no student links.
    pub async fn unlinked_guardian(&self, email: &str) -> String {
        let account_id = self.account(email, AccountRole::Guardian).await;
        GuardianRepository::new()
            .create(
                self.db.as_ref(),
                guardian::ActiveModel {
                    id: Set(IdGenerator::new().generate()),
                    account_id: Set(account_id),
                    phone: Set(None),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await
            .unwrap()
            .id
    }

    pub async fn admin(&self, email: &str) -> String {
        self.account(email, AccountRole::Admin).await
    }
}

pub fn born_years_ago(years: i32) -> NaiveDate {
    let today = Utc::now().date_naive();
    NaiveDate::from_ymd_opt(today.year() - years, 1, 1).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

//! Database integration tests.
//!
//! Run against a migrated in-memory SQLite database by default. Set
//! `TEST_DATABASE_URL` to a scratch `PostgreSQL` database to run them there.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use academy_common::AppError;
use academy_db::entities::account::{self, AccountRole};
use academy_db::entities::enrollment_request::{self, RequestStatus};
use academy_db::entities::payment::{self, PaymentStatus};
use academy_db::entities::{course, student, Frequency};
use academy_db::repositories::{
    AccountRepository, CourseRepository, EnrollmentRequestRepository, PaymentRepository,
    StudentRepository,
};
use academy_db::test_utils::TestDatabase;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set};

async fn seed_student_and_course(db: &DatabaseConnection) -> (String, String) {
    let now = Utc::now();
    AccountRepository::new()
        .create(
            db,
            account::ActiveModel {
                id: Set("acc1".to_string()),
                email: Set("kid@example.com".to_string()),
                name: Set("Kid".to_string()),
                role: Set(AccountRole::Student),
                password_hash: Set(None),
                must_change_password: Set(false),
                created_at: Set(now.into()),
                updated_at: Set(None),
            },
        )
        .await
        .unwrap();

    let student = StudentRepository::new()
        .create(
            db,
            student::ActiveModel {
                id: Set("stu1".to_string()),
                account_id: Set("acc1".to_string()),
                academic_level_id: Set(None),
                date_of_birth: Set(None),
                requires_guardian: Set(true),
                enrollment_status: Set(student::StudentStatus::Prospective),
                created_at: Set(now.into()),
                updated_at: Set(None),
            },
        )
        .await
        .unwrap();

    let course = CourseRepository::new()
        .create(
            db,
            course::ActiveModel {
                id: Set("crs1".to_string()),
                title: Set("Algebra".to_string()),
                academic_level_id: Set(None),
                price_3x_weekly: Set(Some(Decimal::new(8000, 2))),
                price_5x_weekly: Set(None),
                subscription_duration_weeks: Set(4),
                currency: Set(Some("USD".to_string())),
                created_at: Set(now.into()),
            },
        )
        .await
        .unwrap();

    (student.id, course.id)
}

fn request(id: &str, code: &str, student_id: &str, course_id: &str) -> enrollment_request::ActiveModel {
    enrollment_request::ActiveModel {
        id: Set(id.to_string()),
        request_code: Set(code.to_string()),
        student_id: Set(student_id.to_string()),
        course_id: Set(course_id.to_string()),
        frequency: Set(Frequency::ThreeWeekly),
        quoted_price: Set(Decimal::new(8000, 2)),
        message: Set(None),
        status: Set(RequestStatus::Pending),
        routing_path: Set(None),
        rejection_reason: Set(None),
        enrollment_id: Set(None),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        active_key: Set(Some(enrollment_request::active_key(student_id, course_id))),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

#[tokio::test]
async fn test_database_is_migrated() {
    let db = TestDatabase::new().await.expect("Failed to create test database");
    let repo = AccountRepository::new();
    let found = repo.find_by_id(db.connection(), "nobody").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_second_active_request_violates_active_key() {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let (student_id, course_id) = seed_student_and_course(conn).await;
    let repo = EnrollmentRequestRepository::new();

    repo.create(conn, request("r1", "ENR-AAAAAAAA", &student_id, &course_id))
        .await
        .unwrap();

    let err = repo
        .create(conn, request("r2", "ENR-BBBBBBBB", &student_id, &course_id))
        .await
        .unwrap_err();

    assert!(err.is_conflict_on("active_key"), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_terminal_request_frees_the_slot() {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let (student_id, course_id) = seed_student_and_course(conn).await;
    let repo = EnrollmentRequestRepository::new();

    let first = repo
        .create(conn, request("r1", "ENR-AAAAAAAA", &student_id, &course_id))
        .await
        .unwrap();

    let mut cancelled: enrollment_request::ActiveModel = first.into();
    cancelled.status = Set(RequestStatus::Cancelled);
    cancelled.active_key = Set(None);
    repo.update_if_status(conn, "r1", &RequestStatus::ACTIVE, cancelled)
        .await
        .unwrap()
        .unwrap();

    repo.create(conn, request("r2", "ENR-BBBBBBBB", &student_id, &course_id))
        .await
        .unwrap();

    let active = repo
        .find_active(conn, &student_id, &course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, "r2");
}

#[tokio::test]
async fn test_duplicate_request_code_is_conflict() {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let (student_id, course_id) = seed_student_and_course(conn).await;
    let repo = EnrollmentRequestRepository::new();

    let mut first = request("r1", "ENR-SAMECODE", &student_id, &course_id);
    first.active_key = Set(None);
    first.status = Set(RequestStatus::Rejected);
    repo.create(conn, first).await.unwrap();

    let err = repo
        .create(conn, request("r2", "ENR-SAMECODE", &student_id, &course_id))
        .await
        .unwrap_err();

    assert!(err.is_conflict_on("request_code"), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_missing_reference_is_validation_error() {
    let db = TestDatabase::new().await.unwrap();
    let err = EnrollmentRequestRepository::new()
        .create(
            db.connection(),
            request("r1", "ENR-AAAAAAAA", "no-student", "no-course"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_stale_transition_does_not_revive_cancelled_request() {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let (student_id, course_id) = seed_student_and_course(conn).await;
    let repo = EnrollmentRequestRepository::new();

    // Both writers read the request while it was pending.
    let pending = repo
        .create(conn, request("r1", "ENR-AAAAAAAA", &student_id, &course_id))
        .await
        .unwrap();

    let mut cancel: enrollment_request::ActiveModel = pending.clone().into();
    cancel.status = Set(RequestStatus::Cancelled);
    cancel.active_key = Set(None);
    repo.update_if_status(conn, "r1", &RequestStatus::ACTIVE, cancel)
        .await
        .unwrap()
        .unwrap();

    let mut notify: enrollment_request::ActiveModel = pending.into();
    notify.status = Set(RequestStatus::ParentNotified);
    let stale = repo
        .update_if_status(conn, "r1", &[RequestStatus::Pending], notify)
        .await
        .unwrap();
    assert!(stale.is_none());

    let stored = repo.find_by_id(conn, "r1").await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Cancelled);
    assert!(stored.active_key.is_none());
    assert!(
        repo.find_active(conn, &student_id, &course_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_settled_payment_cannot_be_settled_again() {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let (student_id, course_id) = seed_student_and_course(conn).await;
    let repo = PaymentRepository::new();

    let pending = repo
        .create(
            conn,
            payment::ActiveModel {
                id: Set("pay1".to_string()),
                payment_reference: Set("PAY-AAAAAAAA".to_string()),
                student_id: Set(student_id),
                guardian_id: Set(None),
                course_id: Set(course_id),
                enrollment_request_id: Set(None),
                amount: Set(Decimal::new(8000, 2)),
                currency: Set("USD".to_string()),
                receipt_ref: Set("receipts/pay1.pdf".to_string()),
                status: Set(PaymentStatus::Pending),
                admin_notes: Set(None),
                verified_by: Set(None),
                verified_at: Set(None),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            },
        )
        .await
        .unwrap();

    let mut verify: payment::ActiveModel = pending.clone().into();
    verify.status = Set(PaymentStatus::Verified);
    verify.verified_by = Set(Some("admin-1".to_string()));
    let verified = repo.settle_pending(conn, "pay1", verify).await.unwrap();
    assert_eq!(verified.unwrap().status, PaymentStatus::Verified);

    let mut reject: payment::ActiveModel = pending.into();
    reject.status = Set(PaymentStatus::Rejected);
    reject.admin_notes = Set(Some("Blurry receipt".to_string()));
    assert!(repo.settle_pending(conn, "pay1", reject).await.unwrap().is_none());

    let stored = repo.find_by_id(conn, "pay1").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Verified);
    assert!(stored.admin_notes.is_none());
}

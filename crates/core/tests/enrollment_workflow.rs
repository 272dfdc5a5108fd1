//! Enrollment request and payment workflow tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use academy_common::{AppError, IdGenerator};
use academy_core::{
    CreateRequestInput, GuardianInfo, ProvisioningOutcome, SubmitPaymentInput, SubscriptionParams,
};
use academy_db::entities::{
    Frequency,
    enrollment::EnrollmentStatus,
    enrollment_request::{RequestStatus, RoutingPath},
    guardian_student::RelationshipKind,
    parent_registration::RegistrationStatus,
    payment::PaymentStatus,
    student::StudentStatus,
    subscription::SubscriptionStatus,
};
use academy_db::repositories::{
    EnrollmentRepository, GuardianRepository, StudentRepository, SubscriptionRepository,
};
use chrono::{Duration, Utc};
use common::{Harness, ScriptedCodeSource, date};
use rust_decimal::Decimal;

fn three_weekly() -> CreateRequestInput {
    CreateRequestInput {
        frequency: Frequency::ThreeWeekly,
        message: Some("Looking forward to it".to_string()),
    }
}

fn payment_input(student_id: &str, course_id: &str, request_id: Option<&str>) -> SubmitPaymentInput {
    SubmitPaymentInput {
        student_id: student_id.to_string(),
        guardian_id: None,
        course_id: course_id.to_string(),
        enrollment_request_id: request_id.map(str::to_string),
        amount: Decimal::new(80, 0),
        currency: None,
        receipt_ref: "uploads/receipt-001.pdf".to_string(),
    }
}

fn params() -> SubscriptionParams {
    SubscriptionParams {
        frequency: Frequency::ThreeWeekly,
        start_date: date(2024, 1, 1),
        duration_weeks: Some(4),
    }
}

fn guardian_info(email: &str) -> GuardianInfo {
    GuardianInfo {
        email: email.to_string(),
        name: "Pat Parent".to_string(),
        phone: None,
        relationship_kind: RelationshipKind::Guardian,
    }
}

#[tokio::test]
async fn test_parent_payment_path_end_to_end() {
    let h = Harness::new().await;
    let student = h.minor_student("kid@example.com").await;
    let guardian = h.guardian_for(&student, "mom@example.com", true).await;
    let course = h.course(None).await;
    let wf = &h.workflows;

    let request = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.quoted_price, Decimal::new(80, 0));
    assert!(request.request_code.starts_with("ENR-"));

    let notified = wf.requests.notify(&request.id).await.unwrap();
    assert_eq!(notified.routing_path, Some(RoutingPath::ParentPayment));
    assert_eq!(notified.status, RequestStatus::ParentNotified);

    let mut input = payment_input(&student, &course, None);
    input.guardian_id = Some(guardian);
    let payment = wf.payments.submit(input).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.currency, "USD");

    let admin = h.admin("admin@example.com").await;
    let verification = wf
        .payments
        .verify(&payment.id, &admin, None, Some(params()))
        .await
        .unwrap();

    assert_eq!(verification.payment.status, PaymentStatus::Verified);
    assert_eq!(verification.payment.verified_by.as_deref(), Some(admin.as_str()));

    let subscription = verification.subscription.unwrap();
    assert_eq!(subscription.total_sessions, 12);
    assert_eq!(subscription.sessions_remaining, 12);
    assert_eq!(subscription.end_date, date(2024, 1, 29));

    let approved = verification.enrollment_request.unwrap();
    let enrollment = verification.enrollment.unwrap();
    assert_eq!(approved.id, request.id);
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.enrollment_id.as_deref(), Some(enrollment.id.as_str()));
    assert_eq!(enrollment.enrollment_request_id.as_deref(), Some(request.id.as_str()));
    assert_eq!(enrollment.status, EnrollmentStatus::Active);

    let stored = StudentRepository::new()
        .find_by_id(h.db.as_ref(), &student)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.enrollment_status, StudentStatus::Enrolled);

    assert_eq!(
        h.events(),
        vec![
            "EnrollmentRequestCreated",
            "PaymentSubmitted",
            "PaymentVerified",
            "EnrollmentApproved"
        ]
    );
}

#[tokio::test]
async fn test_adult_is_asked_to_pay() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;

    let request = h
        .workflows
        .requests
        .create(&student, &course, three_weekly())
        .await
        .unwrap();
    let notified = h.workflows.requests.notify(&request.id).await.unwrap();

    assert_eq!(notified.routing_path, Some(RoutingPath::StudentPayment));
    assert_eq!(notified.status, RequestStatus::PaymentPending);
    assert_eq!(h.events(), vec!["PaymentRequired"]);

    let again = h.workflows.requests.notify(&request.id).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_minor_with_unconfirmed_guardian_goes_to_admin_review() {
    let h = Harness::new().await;
    let student = h.minor_student("kid@example.com").await;
    h.guardian_for(&student, "dad@example.com", false).await;
    let course = h.course(None).await;

    let request = h
        .workflows
        .requests
        .create(&student, &course, three_weekly())
        .await
        .unwrap();
    let notified = h.workflows.requests.notify(&request.id).await.unwrap();

    assert_eq!(notified.routing_path, Some(RoutingPath::AdminReview));
    assert_eq!(notified.status, RequestStatus::Pending);
    assert_eq!(h.events(), vec!["AdminReviewRequired"]);
}

#[tokio::test]
async fn test_parent_registration_path() {
    let h = Harness::new().await;
    let student = h.minor_student("kid@example.com").await;
    let course = h.course(None).await;
    let wf = &h.workflows;

    let request = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    let routed = wf.requests.notify(&request.id).await.unwrap();
    assert_eq!(routed.routing_path, Some(RoutingPath::ParentRegistration));
    assert_eq!(routed.status, RequestStatus::Pending);
    assert!(h.events().is_empty());

    let notification = wf
        .requests
        .create_guardian_and_notify(&request.id, guardian_info("P@X.com"))
        .await
        .unwrap();
    assert_eq!(notification.request.status, RequestStatus::ParentNotified);

    let ProvisioningOutcome::Registered {
        registration,
        guardian_id,
        temporary_password,
    } = notification.outcome
    else {
        panic!("expected a new registration");
    };
    assert!(registration.registration_code.starts_with("PREG-"));
    assert_eq!(registration.guardian_email, "p@x.com");
    assert_eq!(registration.status, RegistrationStatus::Pending);
    assert_eq!(registration.created_guardian_id.as_deref(), Some(guardian_id.as_str()));
    assert_ne!(registration.temporary_password_hash, temporary_password);
    let ttl = registration.expires_at - registration.created_at;
    assert_eq!(ttl.num_days(), 7);

    let link = GuardianRepository::new()
        .find_link(h.db.as_ref(), &guardian_id, &student)
        .await
        .unwrap()
        .unwrap();
    assert!(link.is_primary_contact);
    assert!(!link.is_confirmed);

    assert_eq!(h.events(), vec!["GuardianWelcome", "EnrollmentRequestCreated"]);
    let welcome = h.sink.events().into_iter().next().unwrap();
    let json = serde_json::to_value(&welcome).unwrap();
    assert_eq!(json["temporaryPassword"], temporary_password.as_str());

    let completed = wf
        .provisioning
        .complete(&registration.registration_code, &temporary_password, "a-new-secret")
        .await
        .unwrap();
    assert_eq!(completed.status, RegistrationStatus::Completed);

    let link = GuardianRepository::new()
        .find_link(h.db.as_ref(), &guardian_id, &student)
        .await
        .unwrap()
        .unwrap();
    assert!(link.is_confirmed);

    let twice = wf
        .provisioning
        .complete(&registration.registration_code, "a-new-secret", "another-secret")
        .await;
    assert!(matches!(twice, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_guardian_only_for_parent_registration_route() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;

    let request = h
        .workflows
        .requests
        .create(&student, &course, three_weekly())
        .await
        .unwrap();
    h.workflows.requests.notify(&request.id).await.unwrap();

    let result = h
        .workflows
        .requests
        .create_guardian_and_notify(&request.id, guardian_info("p@x.com"))
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_provisioning_links_existing_guardian_once() {
    let h = Harness::new().await;
    let student = h.minor_student("kid@example.com").await;
    let sibling = h.minor_student("sib@example.com").await;
    let existing = h.guardian_for(&sibling, "mom@example.com", true).await;
    let course = h.course(None).await;

    let request = h
        .workflows
        .requests
        .create(&student, &course, three_weekly())
        .await
        .unwrap();

    let first = h
        .workflows
        .provisioning
        .create_from_info(&student, &request.id, guardian_info("mom@example.com"))
        .await
        .unwrap();
    assert!(matches!(
        &first,
        ProvisioningOutcome::Linked { guardian_id, link_created: true, .. } if *guardian_id == existing
    ));

    let second = h
        .workflows
        .provisioning
        .create_from_info(&student, &request.id, guardian_info("mom@example.com"))
        .await
        .unwrap();
    assert!(matches!(second, ProvisioningOutcome::Linked { link_created: false, .. }));

    let links = GuardianRepository::new()
        .find_links_for_student(h.db.as_ref(), &student)
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert!(links[0].is_primary_contact);
    assert_eq!(h.events(), vec!["GuardianLinked"]);
}

#[tokio::test]
async fn test_provisioning_rejects_non_guardian_email() {
    let h = Harness::new().await;
    let student = h.minor_student("kid@example.com").await;
    h.adult_student("taken@example.com").await;
    let course = h.course(None).await;

    let request = h
        .workflows
        .requests
        .create(&student, &course, three_weekly())
        .await
        .unwrap();
    let result = h
        .workflows
        .provisioning
        .create_from_info(&student, &request.id, guardian_info("taken@example.com"))
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_concurrent_create_yields_one_request() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;

    let (a, b) = tokio::join!(
        h.workflows.requests.create(&student, &course, three_weekly()),
        h.workflows.requests.create(&student, &course, three_weekly()),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_))))
    );
    assert_eq!(
        h.workflows
            .requests
            .count_by_status(RequestStatus::Pending)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_new_request_allowed_after_cancel() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let wf = &h.workflows;

    let first = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    let cancelled = wf.requests.cancel(&first.id, &student).await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert!(cancelled.enrollment_id.is_none());

    let second = wf.requests.create(&student, &course, three_weekly()).await;
    assert!(second.is_ok());

    let again = wf.requests.cancel(&first.id, &student).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));
    assert_eq!(h.events(), vec!["EnrollmentCancelled"]);
}

#[tokio::test]
async fn test_level_restricted_course_requires_matching_level() {
    let h = Harness::new().await;
    let grade5 = h.level("Grade 5", 5).await;
    let grade6 = h.level("Grade 6", 6).await;
    let student = h
        .student("kid@example.com", None, false, Some(&grade6))
        .await;
    let course = h.course(Some(&grade5)).await;

    let result = h
        .workflows
        .requests
        .create(&student, &course, three_weekly())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_missing_course_price_falls_back_to_default() {
    use academy_db::entities::course;
    use academy_db::repositories::CourseRepository;
    use sea_orm::Set;

    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = CourseRepository::new()
        .create(
            h.db.as_ref(),
            course::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                title: Set("Unpriced".to_string()),
                academic_level_id: Set(None),
                price_3x_weekly: Set(None),
                price_5x_weekly: Set(None),
                subscription_duration_weeks: Set(8),
                currency: Set(None),
                created_at: Set(Utc::now().into()),
            },
        )
        .await
        .unwrap();

    let request = h
        .workflows
        .requests
        .create(
            &student,
            &course.id,
            CreateRequestInput {
                frequency: Frequency::FiveWeekly,
                message: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(request.quoted_price, h.config.default_price_5x_weekly);
}

#[tokio::test]
async fn test_approve_creates_enrollment_once() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let admin = h.admin("admin@example.com").await;
    let wf = &h.workflows;

    let request = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    let approval = wf.requests.approve(&request.id, &admin).await.unwrap();
    assert_eq!(approval.request.status, RequestStatus::Approved);
    assert_eq!(approval.request.reviewed_by.as_deref(), Some(admin.as_str()));
    assert!(approval.request.reviewed_at.is_some());

    let again = wf.requests.approve(&request.id, &admin).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));

    let enrollments = EnrollmentRepository::new()
        .find_by_student(h.db.as_ref(), &student)
        .await
        .unwrap();
    assert_eq!(enrollments.len(), 1);
}

#[tokio::test]
async fn test_approve_when_already_enrolled_rejects_request() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let admin = h.admin("admin@example.com").await;
    let wf = &h.workflows;

    let first = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    wf.requests.approve(&first.id, &admin).await.unwrap();

    let second = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    let result = wf.requests.approve(&second.id, &admin).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let stored = wf.requests.get(&second.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Rejected);
    assert!(stored.enrollment_id.is_none());
    assert!(stored.rejection_reason.is_some());
    assert_eq!(h.events(), vec!["EnrollmentApproved", "EnrollmentRejected"]);
}

#[tokio::test]
async fn test_reject_is_terminal() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let admin = h.admin("admin@example.com").await;
    let wf = &h.workflows;

    let request = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    assert!(matches!(
        wf.requests.reject(&request.id, &admin, "  ").await,
        Err(AppError::Validation(_))
    ));

    let rejected = wf.requests.reject(&request.id, &admin, "Class is full").await.unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Class is full"));
    assert!(rejected.enrollment_id.is_none());

    assert!(matches!(
        wf.requests.approve(&request.id, &admin).await,
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
        wf.requests.cancel(&request.id, &student).await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_rejected_payment_creates_no_subscription() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let admin = h.admin("admin@example.com").await;
    let wf = &h.workflows;

    let payment = wf
        .payments
        .submit(payment_input(&student, &course, None))
        .await
        .unwrap();
    let rejected = wf
        .payments
        .reject(&payment.id, &admin, "Receipt is unreadable")
        .await
        .unwrap();
    assert_eq!(rejected.status, PaymentStatus::Rejected);
    assert_eq!(rejected.admin_notes.as_deref(), Some("Receipt is unreadable"));

    let verify = wf
        .payments
        .verify(&payment.id, &admin, None, Some(params()))
        .await;
    assert!(matches!(verify, Err(AppError::InvalidState(_))));

    let subscription = SubscriptionRepository::new()
        .find_by_payment(h.db.as_ref(), &payment.id)
        .await
        .unwrap();
    assert!(subscription.is_none());
    assert_eq!(h.events(), vec!["PaymentSubmitted", "PaymentRejected"]);
}

#[tokio::test]
async fn test_verify_without_params_only_verifies() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let admin = h.admin("admin@example.com").await;
    let wf = &h.workflows;

    let request = wf.requests.create(&student, &course, three_weekly()).await.unwrap();
    let payment = wf
        .payments
        .submit(payment_input(&student, &course, Some(&request.id)))
        .await
        .unwrap();
    let verification = wf
        .payments
        .verify(&payment.id, &admin, Some("checked".to_string()), None)
        .await
        .unwrap();

    assert!(verification.subscription.is_none());
    assert!(verification.enrollment.is_none());
    assert_eq!(verification.payment.admin_notes.as_deref(), Some("checked"));
    assert_eq!(
        wf.requests.get(&request.id).await.unwrap().status,
        RequestStatus::Pending
    );
}

#[tokio::test]
async fn test_verify_without_request_enrolls_directly() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let admin = h.admin("admin@example.com").await;

    let payment = h
        .workflows
        .payments
        .submit(payment_input(&student, &course, None))
        .await
        .unwrap();
    let verification = h
        .workflows
        .payments
        .verify(&payment.id, &admin, None, Some(params()))
        .await
        .unwrap();

    assert!(verification.enrollment_request.is_none());
    let enrollment = verification.enrollment.unwrap();
    assert!(enrollment.enrollment_request_id.is_none());
    assert_eq!(enrollment.course_id, course);
}

#[tokio::test]
async fn test_submit_validates_amount_and_request() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let other = h.adult_student("other@example.com").await;
    let course = h.course(None).await;

    let mut zero = payment_input(&student, &course, None);
    zero.amount = Decimal::ZERO;
    assert!(matches!(
        h.workflows.payments.submit(zero).await,
        Err(AppError::Validation(_))
    ));

    let foreign = h
        .workflows
        .requests
        .create(&other, &course, three_weekly())
        .await
        .unwrap();
    assert!(matches!(
        h.workflows
            .payments
            .submit(payment_input(&student, &course, Some(&foreign.id)))
            .await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_forced_code_collision_is_retried() {
    let source = ScriptedCodeSource::new(["AAAAAAAA", "AAAAAAAA", "BBBBBBBB"]);
    let h = Harness::with_id_gen(IdGenerator::with_source(Arc::new(source))).await;
    let first_student = h.adult_student("one@example.com").await;
    let second_student = h.adult_student("two@example.com").await;
    let course = h.course(None).await;

    let first = h
        .workflows
        .requests
        .create(&first_student, &course, three_weekly())
        .await
        .unwrap();
    let second = h
        .workflows
        .requests
        .create(&second_student, &course, three_weekly())
        .await
        .unwrap();

    assert_eq!(first.request_code, "ENR-AAAAAAAA");
    assert_eq!(second.request_code, "ENR-BBBBBBBB");
}

#[tokio::test]
async fn test_code_generation_gives_up_after_cap() {
    let source = ScriptedCodeSource::new(["AAAAAAAA"; 6]);
    let h = Harness::with_id_gen(IdGenerator::with_source(Arc::new(source))).await;
    let first_student = h.adult_student("one@example.com").await;
    let second_student = h.adult_student("two@example.com").await;
    let course = h.course(None).await;

    h.workflows
        .requests
        .create(&first_student, &course, three_weekly())
        .await
        .unwrap();
    let result = h
        .workflows
        .requests
        .create(&second_student, &course, three_weekly())
        .await;

    assert!(matches!(result, Err(AppError::ResourceExhausted(_))));
    assert!(
        h.workflows
            .requests
            .list_for_student(&second_student)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_expired_registration_cannot_complete() {
    use academy_db::repositories::ParentRegistrationRepository;
    use sea_orm::{ActiveModelTrait, Set};

    let h = Harness::new().await;
    let student = h.minor_student("kid@example.com").await;
    let course = h.course(None).await;
    let request = h
        .workflows
        .requests
        .create(&student, &course, three_weekly())
        .await
        .unwrap();

    let outcome = h
        .workflows
        .provisioning
        .create_from_info(&student, &request.id, guardian_info("p@x.com"))
        .await
        .unwrap();
    let ProvisioningOutcome::Registered {
        registration,
        temporary_password,
        ..
    } = outcome
    else {
        panic!("expected a new registration");
    };

    let wrong = h
        .workflows
        .provisioning
        .complete(&registration.registration_code, "not-it", "a-new-secret")
        .await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let code = registration.registration_code.clone();
    let mut active: academy_db::entities::parent_registration::ActiveModel = registration.into();
    active.expires_at = Set((Utc::now() - Duration::hours(1)).into());
    active.update(h.db.as_ref()).await.unwrap();

    let result = h
        .workflows
        .provisioning
        .complete(&code, &temporary_password, "a-new-secret")
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));

    let observed = h.workflows.provisioning.get_by_code(&code).await.unwrap();
    assert_eq!(observed.status, RegistrationStatus::Expired);

    let swept = h
        .workflows
        .provisioning
        .expire_stale(Utc::now().into())
        .await
        .unwrap();
    assert_eq!(swept, 1);
    let stored = ParentRegistrationRepository::new()
        .find_by_code(h.db.as_ref(), &code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RegistrationStatus::Expired);
}

#[tokio::test]
async fn test_subscription_cancel_keeps_enrollment_record() {
    let h = Harness::new().await;
    let student = h.adult_student("grown@example.com").await;
    let course = h.course(None).await;
    let admin = h.admin("admin@example.com").await;

    let payment = h
        .workflows
        .payments
        .submit(payment_input(&student, &course, None))
        .await
        .unwrap();
    let verification = h
        .workflows
        .payments
        .verify(&payment.id, &admin, None, Some(params()))
        .await
        .unwrap();
    let subscription = verification.subscription.unwrap();

    let cancelled = h
        .workflows
        .subscriptions
        .cancel(&subscription.id, "Moved away")
        .await
        .unwrap();
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let duplicate = h
        .workflows
        .payments
        .verify(&payment.id, &admin, None, Some(params()))
        .await;
    assert!(matches!(duplicate, Err(AppError::InvalidState(_))));
}

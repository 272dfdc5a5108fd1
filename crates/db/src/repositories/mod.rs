//! Database repositories.
//!
//! Repositories are stateless and take the connection per call, so the same
//! method runs against the pool or inside a caller's transaction.

mod academic_level;
mod account;
mod course;
mod enrollment;
mod enrollment_request;
mod guardian;
mod parent_registration;
mod payment;
mod student;
mod student_promotion;
mod subscription;

pub use academic_level::AcademicLevelRepository;
pub use account::AccountRepository;
pub use course::CourseRepository;
pub use enrollment::EnrollmentRepository;
pub use enrollment_request::EnrollmentRequestRepository;
pub use guardian::GuardianRepository;
pub use parent_registration::ParentRegistrationRepository;
pub use payment::PaymentRepository;
pub use student::StudentRepository;
pub use student_promotion::StudentPromotionRepository;
pub use subscription::SubscriptionRepository;

//! Database entities.

pub mod academic_level;
pub mod account;
pub mod course;
pub mod enrollment;
pub mod enrollment_request;
pub mod enums;
pub mod guardian;
pub mod guardian_student;
pub mod parent_registration;
pub mod payment;
pub mod student;
pub mod student_promotion;
pub mod subscription;

pub use academic_level::Entity as AcademicLevel;
pub use account::Entity as Account;
pub use course::Entity as Course;
pub use enrollment::Entity as Enrollment;
pub use enrollment_request::Entity as EnrollmentRequest;
pub use enums::Frequency;
pub use guardian::Entity as Guardian;
pub use guardian_student::Entity as GuardianStudent;
pub use parent_registration::Entity as ParentRegistration;
pub use payment::Entity as Payment;
pub use student::Entity as Student;
pub use student_promotion::Entity as StudentPromotion;
pub use subscription::Entity as Subscription;

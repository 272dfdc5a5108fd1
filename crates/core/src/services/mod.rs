//! Enrollment workflow services.

#![allow(missing_docs)]

pub mod codes;
pub mod enrollment_request;
pub mod event_sink;
pub mod parent_provisioning;
pub mod password;
pub mod payment;
pub mod promotion;
pub mod routing;
pub mod scheduler;
pub mod subscription;

pub use codes::CodeGenerator;
pub use enrollment_request::{
    Approval, CreateRequestInput, EnrollmentRequestService, GuardianNotification,
    REASON_ALREADY_ENROLLED,
};
pub use event_sink::{
    ChannelEventSink, DomainEvent, EVENT_BUFFER_SIZE, EventSink, EventSinkService,
    NoOpEventSink, RecordingEventSink, run_event_logger,
};
pub use parent_provisioning::{GuardianInfo, ParentProvisioningService, ProvisioningOutcome};
pub use password::{MIN_PASSWORD_LEN, hash_password, verify_password};
pub use payment::{PaymentService, PaymentVerification, SubmitPaymentInput};
pub use promotion::{CreatePromotionInput, PromotionOutcome, PromotionService};
pub use routing::{RoutingInput, RoutingPolicy, age_on};
pub use scheduler::{Maintenance, MaintenanceExecutor, run_scheduler};
pub use subscription::{
    REASON_PERIOD_ENDED, REASON_SESSIONS_COMPLETED, SessionSchedule, SubscriptionParams,
    SubscriptionService, SweepReport, schedule,
};

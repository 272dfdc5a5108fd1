//! Event sink service.
//!
//! Workflows hand domain events to an [`EventSink`] after their transaction
//! commits. Delivery (email, in-app, push) happens behind the sink; a sink
//! failure is logged and counted, never surfaced to the caller.

use academy_common::{AppError, AppResult, Metrics, get_metrics};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Channel buffer size for queued events.
pub const EVENT_BUFFER_SIZE: usize = 1000;

/// Placeholder written in place of credentials in logged payloads.
pub const REDACTED: &str = "[redacted]";

/// Domain events emitted by the enrollment workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    /// Guardians should pay for a request.
    EnrollmentRequestCreated { request_id: String },
    /// The student should pay for a request.
    PaymentRequired { request_id: String },
    /// A request needs a manual routing decision.
    AdminReviewRequired { request_id: String },
    /// A guardian account was provisioned; carries the one-time credential.
    GuardianWelcome {
        registration_id: String,
        guardian_id: String,
        email: String,
        temporary_password: String,
    },
    /// An existing guardian was linked to a student.
    GuardianLinked {
        guardian_id: String,
        student_id: String,
    },
    EnrollmentApproved { request_id: String },
    EnrollmentRejected { request_id: String, reason: String },
    EnrollmentCancelled { request_id: String },
    PaymentSubmitted { payment_id: String },
    PaymentVerified { payment_id: String },
    PaymentRejected { payment_id: String, reason: String },
    StudentPromoted { promotion_id: String },
    SubscriptionExpiring {
        subscription_id: String,
        days_remaining: i64,
    },
    SubscriptionExpired {
        subscription_id: String,
        reason: String,
    },
}

impl DomainEvent {
    /// Stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EnrollmentRequestCreated { .. } => "EnrollmentRequestCreated",
            Self::PaymentRequired { .. } => "PaymentRequired",
            Self::AdminReviewRequired { .. } => "AdminReviewRequired",
            Self::GuardianWelcome { .. } => "GuardianWelcome",
            Self::GuardianLinked { .. } => "GuardianLinked",
            Self::EnrollmentApproved { .. } => "EnrollmentApproved",
            Self::EnrollmentRejected { .. } => "EnrollmentRejected",
            Self::EnrollmentCancelled { .. } => "EnrollmentCancelled",
            Self::PaymentSubmitted { .. } => "PaymentSubmitted",
            Self::PaymentVerified { .. } => "PaymentVerified",
            Self::PaymentRejected { .. } => "PaymentRejected",
            Self::StudentPromoted { .. } => "StudentPromoted",
            Self::SubscriptionExpiring { .. } => "SubscriptionExpiring",
            Self::SubscriptionExpired { .. } => "SubscriptionExpired",
        }
    }

    /// Copy of the event that is safe to write to logs.
    #[must_use]
    pub fn redacted(&self) -> Self {
        match self {
            Self::GuardianWelcome {
                registration_id,
                guardian_id,
                email,
                ..
            } => Self::GuardianWelcome {
                registration_id: registration_id.clone(),
                guardian_id: guardian_id.clone(),
                email: email.clone(),
                temporary_password: REDACTED.to_string(),
            },
            other => other.clone(),
        }
    }

    /// JSON payload for the event log, credentials redacted.
    pub fn log_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.redacted())
    }
}

/// Trait for receiving domain events.
///
/// This allows the workflows to emit events without depending on how they
/// are delivered.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Accept one event. Implementations should not block on delivery.
    async fn publish(&self, event: DomainEvent) -> AppResult<()>;
}

/// Wrapper for boxed EventSink trait object.
pub type EventSinkService = Arc<dyn EventSink>;

/// A no-op sink for when notifications are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn publish(&self, _event: DomainEvent) -> AppResult<()> {
        Ok(())
    }
}

/// A sink that keeps every event in memory, in emission order.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of the events recorded so far.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.events
            .lock()
            .map_err(|_| AppError::Internal("event log poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// A sink that enqueues events on a bounded channel.
///
/// `publish` never waits: a full or closed queue is reported as an error so
/// the caller can log and drop the event.
#[derive(Clone)]
pub struct ChannelEventSink {
    sender: mpsc::Sender<DomainEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiving end of its queue.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.sender
            .try_send(event)
            .map_err(|e| AppError::Internal(format!("Event queue rejected event: {e}")))
    }
}

/// Consume queued events until every sender is dropped.
///
/// Outbound delivery lives outside this service, so the worker records each
/// event in the log for the delivery layer to pick up.
pub async fn run_event_logger(mut receiver: mpsc::Receiver<DomainEvent>) {
    info!("Event worker started");

    while let Some(event) = receiver.recv().await {
        match event.log_payload() {
            Ok(payload) => info!(event = event.name(), %payload, "Domain event"),
            Err(e) => warn!(event = event.name(), error = %e, "Failed to serialize event"),
        }
    }

    info!("Event worker stopped");
}

/// Hand events to the sink, logging and counting failures.
pub(crate) async fn dispatch(sink: Option<&EventSinkService>, events: Vec<DomainEvent>) {
    let Some(sink) = sink else {
        return;
    };

    for event in events {
        let name = event.name();
        if let Err(e) = sink.publish(event).await {
            warn!(event = name, error = %e, "Failed to publish domain event");
            Metrics::incr(&get_metrics().events_dropped);
        } else {
            debug!(event = name, "Published domain event");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn publish(&self, _event: DomainEvent) -> AppResult<()> {
            Err(AppError::Internal("down".to_string()))
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DomainEvent::EnrollmentRejected {
            request_id: "r1".to_string(),
            reason: "full".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EnrollmentRejected");
        assert_eq!(json["requestId"], "r1");
        assert_eq!(json["reason"], "full");
    }

    #[test]
    fn test_log_payload_hides_temporary_password() {
        let event = DomainEvent::GuardianWelcome {
            registration_id: "preg1".to_string(),
            guardian_id: "g1".to_string(),
            email: "parent@example.com".to_string(),
            temporary_password: "SECRETpw1234".to_string(),
        };

        let payload = event.log_payload().unwrap();
        assert!(!payload.contains("SECRETpw1234"));
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["temporaryPassword"], REDACTED);
        assert_eq!(json["email"], "parent@example.com");

        // Sinks still receive the credential for delivery.
        let delivered = serde_json::to_value(&event).unwrap();
        assert_eq!(delivered["temporaryPassword"], "SECRETpw1234");
    }

    #[test]
    fn test_log_payload_keeps_other_events_intact() {
        let event = DomainEvent::PaymentRejected {
            payment_id: "p1".to_string(),
            reason: "Blurry receipt".to_string(),
        };
        assert_eq!(event.redacted(), event);
        assert_eq!(
            event.log_payload().unwrap(),
            serde_json::to_string(&event).unwrap()
        );
    }

    #[tokio::test]
    async fn test_recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        sink.publish(DomainEvent::PaymentSubmitted {
            payment_id: "p1".to_string(),
        })
        .await
        .unwrap();
        sink.publish(DomainEvent::PaymentVerified {
            payment_id: "p1".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(sink.names(), vec!["PaymentSubmitted", "PaymentVerified"]);
    }

    #[tokio::test]
    async fn test_channel_sink_rejects_when_full() {
        let (sink, mut receiver) = ChannelEventSink::new(1);
        let event = DomainEvent::StudentPromoted {
            promotion_id: "pr1".to_string(),
        };

        assert!(sink.publish(event.clone()).await.is_ok());
        assert!(sink.publish(event.clone()).await.is_err());
        assert_eq!(receiver.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_dispatch_swallows_sink_failures() {
        let before = get_metrics().snapshot().events_dropped;
        let sink: EventSinkService = Arc::new(FailingSink);

        dispatch(
            Some(&sink),
            vec![DomainEvent::PaymentVerified {
                payment_id: "p1".to_string(),
            }],
        )
        .await;

        assert!(get_metrics().snapshot().events_dropped > before);
    }
}

//! Core business logic for academy-rs.
//!
//! Each workflow owns one state machine and runs its multi-row writes in a
//! single transaction; events go to the [`EventSink`] after commit.

pub mod services;

use std::sync::Arc;

use academy_common::{IdGenerator, config::EnrollmentConfig};
use sea_orm::DatabaseConnection;

pub use services::*;

/// The full set of workflow services, wired to one database and event sink.
#[derive(Clone)]
pub struct Workflows {
    pub requests: EnrollmentRequestService,
    pub provisioning: ParentProvisioningService,
    pub payments: PaymentService,
    pub subscriptions: SubscriptionService,
    pub promotions: PromotionService,
}

impl Workflows {
    /// Build every service, sharing `id_gen` and `event_sink`.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &EnrollmentConfig,
        id_gen: IdGenerator,
        event_sink: Option<EventSinkService>,
    ) -> Self {
        let mut provisioning =
            ParentProvisioningService::new(Arc::clone(&db), config, id_gen.clone());
        let mut subscriptions = SubscriptionService::new(Arc::clone(&db), config, id_gen.clone());
        let mut promotions = PromotionService::new(Arc::clone(&db), config, id_gen.clone());
        if let Some(sink) = &event_sink {
            provisioning.set_event_sink(Arc::clone(sink));
            subscriptions.set_event_sink(Arc::clone(sink));
            promotions.set_event_sink(Arc::clone(sink));
        }

        let mut requests = EnrollmentRequestService::new(
            Arc::clone(&db),
            config,
            id_gen.clone(),
            provisioning.clone(),
        );
        if let Some(sink) = &event_sink {
            requests.set_event_sink(Arc::clone(sink));
        }

        let mut payments = PaymentService::new(
            db,
            config,
            id_gen,
            requests.clone(),
            subscriptions.clone(),
        );
        if let Some(sink) = event_sink {
            payments.set_event_sink(sink);
        }

        Self {
            requests,
            provisioning,
            payments,
            subscriptions,
            promotions,
        }
    }

    /// Maintenance jobs over these services.
    #[must_use]
    pub fn maintenance(&self, expiring_within_days: i64) -> Maintenance {
        Maintenance::new(
            self.subscriptions.clone(),
            self.provisioning.clone(),
            expiring_within_days,
        )
    }
}

//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Instant;

use academy_common::get_metrics;
use academy_core::{
    EnrollmentRequestService, ParentProvisioningService, PaymentService, PromotionService,
    SubscriptionService, Workflows,
};
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub request_service: EnrollmentRequestService,
    pub provisioning_service: ParentProvisioningService,
    pub payment_service: PaymentService,
    pub subscription_service: SubscriptionService,
    pub promotion_service: PromotionService,
    pub db: Arc<DatabaseConnection>,
}

impl AppState {
    /// Build the state from the wired workflow services.
    #[must_use]
    pub fn new(workflows: Workflows, db: Arc<DatabaseConnection>) -> Self {
        Self {
            request_service: workflows.requests,
            provisioning_service: workflows.provisioning,
            payment_service: workflows.payments,
            subscription_service: workflows.subscriptions,
            promotion_service: workflows.promotions,
            db,
        }
    }
}

/// Record status class and latency of every request.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(req).await;
    get_metrics().record_http_request(response.status().as_u16(), start.elapsed());
    response
}

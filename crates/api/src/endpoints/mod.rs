//! API endpoints.

mod metrics;
mod payments;
mod promotions;
mod registrations;
mod requests;
mod subscriptions;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/enrollment-requests", requests::router())
        .nest("/registrations", registrations::router())
        .nest("/payments", payments::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/promotions", promotions::router())
        .nest("/metrics", metrics::router())
}

//! Metrics endpoints for monitoring and observability.
//!
//! Provides endpoints for:
//! - Prometheus metrics export
//! - Health checks
//! - Workflow transition counters

use academy_common::metrics::{MetricsSnapshot, get_metrics};
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use crate::middleware::AppState;

/// Create the metrics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_metrics_json))
        .route("/prometheus", get(get_metrics_prometheus))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}

/// JSON metrics response.
#[derive(Serialize)]
pub struct MetricsResponse {
    pub http: HttpMetrics,
    pub enrollment: EnrollmentMetrics,
    pub payments: PaymentMetrics,
    pub subscriptions: SubscriptionMetrics,
    pub promotions: PromotionMetrics,
    pub internals: InternalMetrics,
}

#[derive(Serialize)]
pub struct HttpMetrics {
    pub requests_total: u64,
    pub requests_2xx: u64,
    pub requests_4xx: u64,
    pub requests_5xx: u64,
    pub latency_avg_us: u64,
}

#[derive(Serialize)]
pub struct EnrollmentMetrics {
    pub requests_created: u64,
    pub requests_approved: u64,
    pub requests_rejected: u64,
    pub requests_cancelled: u64,
    pub guardians_provisioned: u64,
}

#[derive(Serialize)]
pub struct PaymentMetrics {
    pub submitted: u64,
    pub verified: u64,
    pub rejected: u64,
}

#[derive(Serialize)]
pub struct SubscriptionMetrics {
    pub created: u64,
    pub expired: u64,
}

#[derive(Serialize)]
pub struct PromotionMetrics {
    pub completed: u64,
}

#[derive(Serialize)]
pub struct InternalMetrics {
    pub events_dropped: u64,
    pub code_collisions: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            http: HttpMetrics {
                requests_total: s.http_requests_total,
                requests_2xx: s.http_requests_2xx,
                requests_4xx: s.http_requests_4xx,
                requests_5xx: s.http_requests_5xx,
                latency_avg_us: s.http_request_latency_avg_us,
            },
            enrollment: EnrollmentMetrics {
                requests_created: s.enrollment_requests_created,
                requests_approved: s.enrollment_requests_approved,
                requests_rejected: s.enrollment_requests_rejected,
                requests_cancelled: s.enrollment_requests_cancelled,
                guardians_provisioned: s.guardians_provisioned,
            },
            payments: PaymentMetrics {
                submitted: s.payments_submitted,
                verified: s.payments_verified,
                rejected: s.payments_rejected,
            },
            subscriptions: SubscriptionMetrics {
                created: s.subscriptions_created,
                expired: s.subscriptions_expired,
            },
            promotions: PromotionMetrics {
                completed: s.promotions_completed,
            },
            internals: InternalMetrics {
                events_dropped: s.events_dropped,
                code_collisions: s.code_collisions,
            },
        }
    }
}

/// Get metrics in JSON format.
async fn get_metrics_json() -> Json<MetricsResponse> {
    let snapshot = get_metrics().snapshot();
    Json(MetricsResponse::from(snapshot))
}

/// Get metrics in Prometheus text format.
async fn get_metrics_prometheus() -> Response {
    let prometheus_output = get_metrics().to_prometheus();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        prometheus_output,
    )
        .into_response()
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Simple health check (liveness probe).
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub database: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    pub latency_ms: Option<u64>,
}

/// Readiness check (readiness probe).
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let start = std::time::Instant::now();

    let db_check = match state.db.ping().await {
        Ok(()) => CheckResult {
            status: "ok".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database readiness check failed");
            CheckResult {
                status: format!("error: {e}"),
                latency_ms: None,
            }
        }
    };

    let ready = db_check.status == "ok";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            checks: ReadinessChecks { database: db_check },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            http_requests_total: 100,
            http_requests_2xx: 90,
            http_requests_4xx: 8,
            http_requests_5xx: 2,
            http_request_latency_avg_us: 1500,

            enrollment_requests_created: 40,
            enrollment_requests_approved: 25,
            enrollment_requests_rejected: 5,
            enrollment_requests_cancelled: 3,
            guardians_provisioned: 12,

            payments_submitted: 30,
            payments_verified: 26,
            payments_rejected: 2,

            subscriptions_created: 26,
            subscriptions_expired: 4,

            promotions_completed: 7,

            events_dropped: 1,
            code_collisions: 0,
        }
    }

    #[test]
    fn test_metrics_response_from_snapshot() {
        let response = MetricsResponse::from(snapshot());

        assert_eq!(response.http.requests_total, 100);
        assert_eq!(response.http.latency_avg_us, 1500);
        assert_eq!(response.enrollment.requests_approved, 25);
        assert_eq!(response.enrollment.guardians_provisioned, 12);
        assert_eq!(response.payments.rejected, 2);
        assert_eq!(response.subscriptions.expired, 4);
        assert_eq!(response.promotions.completed, 7);
        assert_eq!(response.internals.events_dropped, 1);
    }

    #[tokio::test]
    async fn test_health_check_reports_version() {
        let Json(health) = health_check().await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }
}

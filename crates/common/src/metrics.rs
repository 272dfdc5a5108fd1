//! Metrics collection for academy-rs.
//!
//! Counters for HTTP traffic and for every enrollment workflow transition,
//! exported as JSON snapshots or Prometheus text.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Application metrics collector.
#[derive(Debug)]
pub struct Metrics {
    // === Request Metrics ===
    pub http_requests_total: AtomicU64,
    pub http_requests_2xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    pub http_request_latency_us_total: AtomicU64,

    // === Enrollment Metrics ===
    pub enrollment_requests_created: AtomicU64,
    pub enrollment_requests_approved: AtomicU64,
    pub enrollment_requests_rejected: AtomicU64,
    pub enrollment_requests_cancelled: AtomicU64,
    pub guardians_provisioned: AtomicU64,

    // === Payment Metrics ===
    pub payments_submitted: AtomicU64,
    pub payments_verified: AtomicU64,
    pub payments_rejected: AtomicU64,

    // === Subscription Metrics ===
    pub subscriptions_created: AtomicU64,
    pub subscriptions_expired: AtomicU64,

    // === Promotion Metrics ===
    pub promotions_completed: AtomicU64,

    // === Event Metrics ===
    /// Events the sink refused or failed to accept.
    pub events_dropped: AtomicU64,
    /// Business code collisions retried.
    pub code_collisions: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_request_latency_us_total: AtomicU64::new(0),

            enrollment_requests_created: AtomicU64::new(0),
            enrollment_requests_approved: AtomicU64::new(0),
            enrollment_requests_rejected: AtomicU64::new(0),
            enrollment_requests_cancelled: AtomicU64::new(0),
            guardians_provisioned: AtomicU64::new(0),

            payments_submitted: AtomicU64::new(0),
            payments_verified: AtomicU64::new(0),
            payments_rejected: AtomicU64::new(0),

            subscriptions_created: AtomicU64::new(0),
            subscriptions_expired: AtomicU64::new(0),

            promotions_completed: AtomicU64::new(0),

            events_dropped: AtomicU64::new(0),
            code_collisions: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one.
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, status_code: u16, latency: Duration) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);

        match status_code {
            200..=299 => self.http_requests_2xx.fetch_add(1, Ordering::Relaxed),
            400..=499 => self.http_requests_4xx.fetch_add(1, Ordering::Relaxed),
            500..=599 => self.http_requests_5xx.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };

        self.http_request_latency_us_total
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            http_requests_total: load(&self.http_requests_total),
            http_requests_2xx: load(&self.http_requests_2xx),
            http_requests_4xx: load(&self.http_requests_4xx),
            http_requests_5xx: load(&self.http_requests_5xx),
            http_request_latency_avg_us: self.average_latency_us(),

            enrollment_requests_created: load(&self.enrollment_requests_created),
            enrollment_requests_approved: load(&self.enrollment_requests_approved),
            enrollment_requests_rejected: load(&self.enrollment_requests_rejected),
            enrollment_requests_cancelled: load(&self.enrollment_requests_cancelled),
            guardians_provisioned: load(&self.guardians_provisioned),

            payments_submitted: load(&self.payments_submitted),
            payments_verified: load(&self.payments_verified),
            payments_rejected: load(&self.payments_rejected),

            subscriptions_created: load(&self.subscriptions_created),
            subscriptions_expired: load(&self.subscriptions_expired),

            promotions_completed: load(&self.promotions_completed),

            events_dropped: load(&self.events_dropped),
            code_collisions: load(&self.code_collisions),
        }
    }

    /// Calculate average HTTP request latency.
    fn average_latency_us(&self) -> u64 {
        let total = self.http_request_latency_us_total.load(Ordering::Relaxed);
        let count = self.http_requests_total.load(Ordering::Relaxed);
        if count > 0 { total / count } else { 0 }
    }

    /// Export metrics in Prometheus format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut output = String::new();

        output.push_str("# HELP academy_http_requests_total Total HTTP requests\n");
        output.push_str("# TYPE academy_http_requests_total counter\n");
        output.push_str(&format!(
            "academy_http_requests_total {}\n",
            s.http_requests_total
        ));

        output.push_str("# HELP academy_http_requests_by_status HTTP requests by status class\n");
        output.push_str("# TYPE academy_http_requests_by_status counter\n");
        for (class, value) in [
            ("2xx", s.http_requests_2xx),
            ("4xx", s.http_requests_4xx),
            ("5xx", s.http_requests_5xx),
        ] {
            output.push_str(&format!(
                "academy_http_requests_by_status{{status=\"{class}\"}} {value}\n"
            ));
        }

        output.push_str("# HELP academy_workflow_transitions_total Workflow transitions\n");
        output.push_str("# TYPE academy_workflow_transitions_total counter\n");
        for (transition, value) in [
            ("enrollment_created", s.enrollment_requests_created),
            ("enrollment_approved", s.enrollment_requests_approved),
            ("enrollment_rejected", s.enrollment_requests_rejected),
            ("enrollment_cancelled", s.enrollment_requests_cancelled),
            ("guardian_provisioned", s.guardians_provisioned),
            ("payment_submitted", s.payments_submitted),
            ("payment_verified", s.payments_verified),
            ("payment_rejected", s.payments_rejected),
            ("subscription_created", s.subscriptions_created),
            ("subscription_expired", s.subscriptions_expired),
            ("promotion_completed", s.promotions_completed),
        ] {
            output.push_str(&format!(
                "academy_workflow_transitions_total{{transition=\"{transition}\"}} {value}\n"
            ));
        }

        output.push_str("# HELP academy_events_dropped_total Events the sink did not accept\n");
        output.push_str("# TYPE academy_events_dropped_total counter\n");
        output.push_str(&format!("academy_events_dropped_total {}\n", s.events_dropped));

        output.push_str("# HELP academy_code_collisions_total Business code collisions retried\n");
        output.push_str("# TYPE academy_code_collisions_total counter\n");
        output.push_str(&format!("academy_code_collisions_total {}\n", s.code_collisions));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    // HTTP
    pub http_requests_total: u64,
    pub http_requests_2xx: u64,
    pub http_requests_4xx: u64,
    pub http_requests_5xx: u64,
    pub http_request_latency_avg_us: u64,

    // Enrollment
    pub enrollment_requests_created: u64,
    pub enrollment_requests_approved: u64,
    pub enrollment_requests_rejected: u64,
    pub enrollment_requests_cancelled: u64,
    pub guardians_provisioned: u64,

    // Payments
    pub payments_submitted: u64,
    pub payments_verified: u64,
    pub payments_rejected: u64,

    // Subscriptions
    pub subscriptions_created: u64,
    pub subscriptions_expired: u64,

    // Promotions
    pub promotions_completed: u64,

    // Plumbing
    pub events_dropped: u64,
    pub code_collisions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        let metrics = Metrics::new();

        metrics.record_http_request(200, Duration::from_millis(50));
        metrics.record_http_request(409, Duration::from_millis(10));
        metrics.record_http_request(500, Duration::from_millis(100));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.http_requests_total, 3);
        assert_eq!(snapshot.http_requests_2xx, 1);
        assert_eq!(snapshot.http_requests_4xx, 1);
        assert_eq!(snapshot.http_requests_5xx, 1);
    }

    #[test]
    fn test_workflow_counters() {
        let metrics = Metrics::new();
        Metrics::incr(&metrics.payments_verified);
        Metrics::incr(&metrics.payments_verified);
        Metrics::incr(&metrics.subscriptions_created);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.payments_verified, 2);
        assert_eq!(snapshot.subscriptions_created, 1);
        assert_eq!(snapshot.payments_rejected, 0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_http_request(200, Duration::from_millis(50));
        Metrics::incr(&metrics.promotions_completed);

        let prometheus = metrics.to_prometheus();
        assert!(prometheus.contains("academy_http_requests_total 1"));
        assert!(prometheus.contains("academy_http_requests_by_status{status=\"2xx\"} 1"));
        assert!(prometheus.contains(
            "academy_workflow_transitions_total{transition=\"promotion_completed\"} 1"
        ));
    }

    #[test]
    fn test_average_latency() {
        let metrics = Metrics::new();
        assert_eq!(metrics.average_latency_us(), 0);
        metrics.record_http_request(200, Duration::from_micros(100));
        metrics.record_http_request(200, Duration::from_micros(200));
        assert_eq!(metrics.average_latency_us(), 150);
    }
}

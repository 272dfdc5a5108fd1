//! Scheduled jobs for periodic maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use academy_common::{AppResult, config::SchedulerConfig};
use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::services::parent_provisioning::ParentProvisioningService;
use crate::services::subscription::SubscriptionService;

/// Executor for the periodic maintenance jobs.
#[async_trait]
pub trait MaintenanceExecutor: Send + Sync {
    /// Expire overdue subscriptions and announce those expiring soon.
    /// Returns the number of subscriptions touched.
    async fn sweep_subscriptions(&self) -> AppResult<u64>;

    /// Expire parent registrations past their deadline.
    async fn expire_registrations(&self) -> AppResult<u64>;
}

/// Maintenance jobs backed by the workflow services.
#[derive(Clone)]
pub struct Maintenance {
    subscriptions: SubscriptionService,
    provisioning: ParentProvisioningService,
    expiring_within_days: i64,
}

impl Maintenance {
    #[must_use]
    pub const fn new(
        subscriptions: SubscriptionService,
        provisioning: ParentProvisioningService,
        expiring_within_days: i64,
    ) -> Self {
        Self {
            subscriptions,
            provisioning,
            expiring_within_days,
        }
    }
}

#[async_trait]
impl MaintenanceExecutor for Maintenance {
    async fn sweep_subscriptions(&self) -> AppResult<u64> {
        let report = self
            .subscriptions
            .sweep(Utc::now().date_naive(), self.expiring_within_days)
            .await?;
        Ok((report.expired.len() + report.expiring.len()) as u64)
    }

    async fn expire_registrations(&self) -> AppResult<u64> {
        self.provisioning.expire_stale(Utc::now().into()).await
    }
}

/// Spawn the maintenance loops. Each job runs on its own interval; a failed
/// run is logged and retried on the next tick.
pub fn run_scheduler<E: MaintenanceExecutor + 'static>(
    config: &SchedulerConfig,
    executor: Arc<E>,
) -> Vec<JoinHandle<()>> {
    let subscription_interval = Duration::from_secs(config.subscription_sweep_secs.max(1));
    let registration_interval = Duration::from_secs(config.registration_sweep_secs.max(1));
    let executor_subscriptions = executor.clone();
    let executor_registrations = executor;

    let subscriptions = tokio::spawn(async move {
        let mut interval = interval(subscription_interval);
        loop {
            interval.tick().await;
            match executor_subscriptions.sweep_subscriptions().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Swept subscriptions");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Subscription sweep failed");
                }
            }
        }
    });

    let registrations = tokio::spawn(async move {
        let mut interval = interval(registration_interval);
        loop {
            interval.tick().await;
            match executor_registrations.expire_registrations().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Expired parent registrations");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Parent registration sweep failed");
                }
            }
        }
    });

    tracing::info!(
        subscription_sweep_secs = subscription_interval.as_secs(),
        registration_sweep_secs = registration_interval.as_secs(),
        "Maintenance scheduler started"
    );

    vec![subscriptions, registrations]
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_common::AppError;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct CountingExecutor {
        subscription_runs: AtomicU64,
        registration_runs: AtomicU64,
    }

    #[async_trait]
    impl MaintenanceExecutor for CountingExecutor {
        async fn sweep_subscriptions(&self) -> AppResult<u64> {
            self.subscription_runs.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }

        async fn expire_registrations(&self) -> AppResult<u64> {
            self.registration_runs.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Internal("database unavailable".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_on_their_intervals() {
        let config = SchedulerConfig {
            enabled: true,
            subscription_sweep_secs: 60,
            registration_sweep_secs: 600,
            expiring_within_days: 7,
        };
        let executor = Arc::new(CountingExecutor::default());

        let handles = run_scheduler(&config, executor.clone());
        tokio::time::sleep(Duration::from_secs(150)).await;

        // Ticks at 0s, 60s, 120s; the registration job ticks once at 0s.
        assert_eq!(executor.subscription_runs.load(Ordering::SeqCst), 3);
        assert_eq!(executor.registration_runs.load(Ordering::SeqCst), 1);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_keeps_loop_alive() {
        let config = SchedulerConfig {
            enabled: true,
            subscription_sweep_secs: 3600,
            registration_sweep_secs: 10,
            expiring_within_days: 7,
        };
        let executor = Arc::new(CountingExecutor::default());

        let handles = run_scheduler(&config, executor.clone());
        tokio::time::sleep(Duration::from_secs(35)).await;

        assert_eq!(executor.registration_runs.load(Ordering::SeqCst), 4);

        for handle in handles {
            handle.abort();
        }
    }
}

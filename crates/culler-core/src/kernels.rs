//! Kernel eviction policy

use chrono::{DateTime, Utc};
use culler_api::{CullMode, CullReport};
use culler_host_api::KernelManager;
use culler_util::KernelId;
use tracing::{debug, error};

use crate::policy::{ResourceKind, culled_ids, evict, exceeded_idle};

/// Shuts down kernels idle longer than the timeout. Busy kernels are never
/// touched.
pub struct KernelPolicy<'a> {
    manager: &'a dyn KernelManager,
}

impl<'a> KernelPolicy<'a> {
    pub fn new(manager: &'a dyn KernelManager) -> Self {
        Self { manager }
    }

    /// Evaluate every kernel against `timeout_minutes`
    pub async fn evaluate(
        &self,
        now: DateTime<Utc>,
        timeout_minutes: u64,
        mode: CullMode,
    ) -> Vec<CullReport> {
        let mut reports = Vec::new();

        let ids = match self.manager.list_kernel_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Failed to list kernels");
                return reports;
            }
        };

        for id in ids {
            let kernel = match self.manager.get_kernel(&id).await {
                Ok(Some(kernel)) => kernel,
                Ok(None) => continue,
                Err(e) => {
                    error!(kernel_id = %id, error = %e, "Failed to get kernel");
                    continue;
                }
            };

            if kernel.is_busy() {
                debug!(kernel_id = %id, "Skipping busy kernel");
                continue;
            }

            let Some(idle) = exceeded_idle(
                ResourceKind::Kernel,
                id.as_str(),
                kernel.last_activity.as_ref(),
                now,
                timeout_minutes,
            ) else {
                continue;
            };

            let report = evict(
                ResourceKind::Kernel,
                id.as_str(),
                idle,
                timeout_minutes,
                mode,
                self.manager.shutdown_kernel(&id),
            )
            .await;
            reports.push(report);
        }

        reports
    }

    /// Shut down idle kernels, returning the ones that were shut down
    pub async fn run(&self, now: DateTime<Utc>, timeout_minutes: u64) -> Vec<KernelId> {
        let reports = self.evaluate(now, timeout_minutes, CullMode::Execute).await;
        culled_ids(reports).into_iter().map(KernelId::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use culler_api::CullAction;
    use culler_host_api::{ExecutionState, KernelInfo, MockKernelManager};

    fn idle_kernel(id: &str, minutes: i64, now: DateTime<Utc>) -> KernelInfo {
        KernelInfo::new(id)
            .with_state(ExecutionState::Idle)
            .with_last_activity(now - Duration::minutes(minutes))
    }

    #[tokio::test]
    async fn culls_only_kernels_past_timeout() {
        let now = Utc::now();
        let manager = MockKernelManager::new();
        manager.insert(idle_kernel("old", 120, now));
        manager.insert(idle_kernel("fresh", 5, now));

        let culled = KernelPolicy::new(&manager).run(now, 60).await;

        assert_eq!(culled, vec![KernelId::new("old")]);
        assert_eq!(manager.shutdown_calls(), vec![KernelId::new("old")]);
    }

    #[tokio::test]
    async fn busy_kernels_are_never_culled() {
        let now = Utc::now();
        let manager = MockKernelManager::new();
        for days in [1, 30, 365] {
            manager.insert(
                KernelInfo::new(format!("busy-{days}"))
                    .with_state(ExecutionState::Busy)
                    .with_last_activity(now - Duration::days(days)),
            );
        }

        let culled = KernelPolicy::new(&manager).run(now, 0).await;

        assert!(culled.is_empty());
        assert!(manager.shutdown_calls().is_empty());
    }

    #[tokio::test]
    async fn kernel_without_activity_is_skipped() {
        let now = Utc::now();
        let manager = MockKernelManager::new();
        manager.insert(KernelInfo::new("new").with_state(ExecutionState::Starting));

        assert!(KernelPolicy::new(&manager).run(now, 0).await.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_yields_nothing() {
        let now = Utc::now();
        let manager = MockKernelManager::new();
        manager.insert(idle_kernel("old", 120, now));
        *manager.fail_list.lock().unwrap() = true;

        assert!(KernelPolicy::new(&manager).run(now, 60).await.is_empty());
        assert!(manager.shutdown_calls().is_empty());
    }

    #[tokio::test]
    async fn per_kernel_failures_do_not_stop_the_pass() {
        let now = Utc::now();
        let manager = MockKernelManager::new();
        manager.insert(idle_kernel("a", 120, now));
        manager.insert(idle_kernel("b", 120, now));
        manager.insert(idle_kernel("c", 120, now));
        manager.fail_get.lock().unwrap().insert(KernelId::new("a"));
        manager.fail_shutdown.lock().unwrap().insert(KernelId::new("b"));

        let reports = KernelPolicy::new(&manager)
            .evaluate(now, 60, CullMode::Execute)
            .await;

        let failed: Vec<_> = reports
            .iter()
            .filter(|r| r.action == CullAction::Failed)
            .map(|r| r.id.as_str())
            .collect();
        let culled: Vec<_> = reports
            .iter()
            .filter(|r| r.action == CullAction::Culled)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(failed, vec!["b"]);
        assert_eq!(culled, vec!["c"]);
    }

    #[tokio::test]
    async fn dry_run_reports_without_shutdown() {
        let now = Utc::now();
        let manager = MockKernelManager::new();
        manager.insert(idle_kernel("old", 180, now));

        let reports = KernelPolicy::new(&manager)
            .evaluate(now, 60, CullMode::DryRun)
            .await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].action, CullAction::WouldCull);
        assert_eq!(reports[0].idle_time, "3.0h");
        assert!(manager.shutdown_calls().is_empty());
    }
}

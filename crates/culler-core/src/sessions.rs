//! Session eviction policy

use chrono::{DateTime, Utc};
use culler_api::{CullMode, CullReport};
use culler_host_api::{KernelManager, SessionManager};
use culler_util::SessionId;
use tracing::{debug, error};

use crate::policy::{ResourceKind, culled_ids, evict, exceeded_idle};

/// Deletes sessions whose kernel has been idle longer than the timeout.
///
/// Idle and busy state come from the session's kernel, but only the session
/// record is deleted.
pub struct SessionPolicy<'a> {
    sessions: &'a dyn SessionManager,
    kernels: &'a dyn KernelManager,
}

impl<'a> SessionPolicy<'a> {
    pub fn new(sessions: &'a dyn SessionManager, kernels: &'a dyn KernelManager) -> Self {
        Self { sessions, kernels }
    }

    pub async fn evaluate(
        &self,
        now: DateTime<Utc>,
        timeout_minutes: u64,
        mode: CullMode,
    ) -> Vec<CullReport> {
        let mut reports = Vec::new();

        let sessions = match self.sessions.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(error = %e, "Failed to list sessions");
                return reports;
            }
        };

        for session in sessions {
            let Some(session_id) = session.id.as_ref() else {
                continue;
            };
            let Some(kernel_id) = session.kernel_id() else {
                continue;
            };

            let kernel = match self.kernels.get_kernel(kernel_id).await {
                Ok(Some(kernel)) => kernel,
                Ok(None) => continue,
                Err(e) => {
                    error!(
                        session_id = %session_id,
                        kernel_id = %kernel_id,
                        error = %e,
                        "Failed to get kernel for session"
                    );
                    continue;
                }
            };

            if kernel.is_busy() {
                debug!(session_id = %session_id, "Skipping session with busy kernel");
                continue;
            }

            let Some(idle) = exceeded_idle(
                ResourceKind::Session,
                session_id.as_str(),
                kernel.last_activity.as_ref(),
                now,
                timeout_minutes,
            ) else {
                continue;
            };

            let report = evict(
                ResourceKind::Session,
                session_id.as_str(),
                idle,
                timeout_minutes,
                mode,
                self.sessions.delete_session(session_id),
            )
            .await;
            reports.push(report);
        }

        reports
    }

    /// Delete idle sessions, returning the ones that were deleted
    pub async fn run(&self, now: DateTime<Utc>, timeout_minutes: u64) -> Vec<SessionId> {
        let reports = self.evaluate(now, timeout_minutes, CullMode::Execute).await;
        culled_ids(reports).into_iter().map(SessionId::new).collect()
    }
}

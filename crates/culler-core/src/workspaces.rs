//! Workspace eviction policy

use chrono::{DateTime, Utc};
use culler_api::{CullMode, CullReport};
use culler_host_api::WorkspaceSource;
use culler_util::WorkspaceId;
use tracing::{debug, error};

use crate::policy::{ResourceKind, culled_ids, evict, exceeded_idle};

/// Deletes workspaces not modified within the timeout.
///
/// The `default` workspace is never considered.
pub struct WorkspacePolicy<'a> {
    source: &'a WorkspaceSource,
}

impl<'a> WorkspacePolicy<'a> {
    pub fn new(source: &'a WorkspaceSource) -> Self {
        Self { source }
    }

    pub async fn evaluate(
        &self,
        now: DateTime<Utc>,
        timeout_minutes: u64,
        mode: CullMode,
    ) -> Vec<CullReport> {
        let mut reports = Vec::new();

        let Some(manager) = self.source.get().await else {
            debug!("No workspace manager, skipping workspaces");
            return reports;
        };

        let workspaces = match manager.list_workspaces().await {
            Ok(workspaces) => workspaces,
            Err(e) => {
                error!(error = %e, "Failed to list workspaces");
                return reports;
            }
        };

        for workspace in workspaces {
            let id = workspace.id();
            if id.is_default() {
                continue;
            }

            let Some(idle) = exceeded_idle(
                ResourceKind::Workspace,
                id.as_str(),
                workspace.metadata.last_modified.as_ref(),
                now,
                timeout_minutes,
            ) else {
                continue;
            };

            let report = evict(
                ResourceKind::Workspace,
                id.as_str(),
                idle,
                timeout_minutes,
                mode,
                manager.delete(id),
            )
            .await;
            reports.push(report);
        }

        reports
    }

    /// Delete stale workspaces, returning the ones that were deleted
    pub async fn run(&self, now: DateTime<Utc>, timeout_minutes: u64) -> Vec<WorkspaceId> {
        let reports = self.evaluate(now, timeout_minutes, CullMode::Execute).await;
        culled_ids(reports).into_iter().map(WorkspaceId::new).collect()
    }
}

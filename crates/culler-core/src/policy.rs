//! Shared eviction policy logic

use chrono::{DateTime, Utc};
use culler_api::{CullAction, CullMode, CullReport};
use culler_host_api::HostResult;
use culler_util::{ActivityTimestamp, format_idle, idle_seconds, timeout_seconds};
use std::future::Future;
use tracing::{error, info};

/// Kind of resource a policy evicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Kernel,
    Terminal,
    Session,
    Workspace,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Kernel => "kernel",
            ResourceKind::Terminal => "terminal",
            ResourceKind::Session => "session",
            ResourceKind::Workspace => "workspace",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Idle seconds of a resource if it exceeds `timeout_minutes`.
///
/// Absent activity never exceeds. An unparseable timestamp is logged and
/// treated as a failure for that resource only.
pub(crate) fn exceeded_idle(
    kind: ResourceKind,
    id: &str,
    last_activity: Option<&ActivityTimestamp>,
    now: DateTime<Utc>,
    timeout_minutes: u64,
) -> Option<f64> {
    let idle = match idle_seconds(last_activity, now) {
        Ok(idle) => idle,
        Err(e) => {
            error!(kind = %kind, id, error = %e, "Failed to compute idle time");
            return None;
        }
    };

    if idle < 0.0 {
        return None;
    }

    (idle > timeout_seconds(timeout_minutes)).then_some(idle)
}

/// Evict one resource (or report that it would be) and describe the outcome
pub(crate) async fn evict<F>(
    kind: ResourceKind,
    id: &str,
    idle: f64,
    timeout_minutes: u64,
    mode: CullMode,
    eviction: F,
) -> CullReport
where
    F: Future<Output = HostResult<()>>,
{
    let idle_time = format_idle(idle);

    let action = match mode {
        CullMode::DryRun => CullAction::WouldCull,
        CullMode::Execute => {
            info!(
                kind = %kind,
                id,
                idle_minutes = (idle / 6.0).round() / 10.0,
                threshold_minutes = timeout_minutes,
                "Culling idle resource"
            );
            match eviction.await {
                Ok(()) => {
                    info!(kind = %kind, id, "Culled successfully");
                    CullAction::Culled
                }
                Err(e) => {
                    error!(kind = %kind, id, error = %e, "Failed to cull");
                    CullAction::Failed
                }
            }
        }
    };

    CullReport {
        id: id.to_string(),
        idle_time,
        action,
    }
}

/// Identifiers of the reports whose resources were actually evicted
pub(crate) fn culled_ids(reports: Vec<CullReport>) -> Vec<String> {
    reports
        .into_iter()
        .filter(|r| r.action == CullAction::Culled)
        .map(|r| r.id)
        .collect()
}

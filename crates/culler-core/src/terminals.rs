//! Terminal eviction policy

use chrono::{DateTime, Utc};
use culler_api::{CullMode, CullReport};
use culler_host_api::TerminalManager;
use culler_util::TerminalName;
use std::collections::HashSet;
use tracing::{debug, error, warn};

use crate::policy::{ResourceKind, culled_ids, evict, exceeded_idle};

/// Terminates terminals idle longer than the timeout
pub struct TerminalPolicy<'a> {
    manager: Option<&'a dyn TerminalManager>,
}

impl<'a> TerminalPolicy<'a> {
    /// `None` when the host has no terminal support
    pub fn new(manager: Option<&'a dyn TerminalManager>) -> Self {
        Self { manager }
    }

    /// Evaluate every named terminal. Names in `exempt` are skipped
    /// regardless of idle time.
    pub async fn evaluate(
        &self,
        now: DateTime<Utc>,
        timeout_minutes: u64,
        exempt: &HashSet<TerminalName>,
        mode: CullMode,
    ) -> Vec<CullReport> {
        let mut reports = Vec::new();

        let Some(manager) = self.manager else {
            warn!("Terminal manager not available");
            return reports;
        };

        let terminals = match manager.list().await {
            Ok(terminals) => terminals,
            Err(e) => {
                error!(error = %e, "Failed to list terminals");
                return reports;
            }
        };

        for terminal in terminals {
            let Some(name) = terminal.name else {
                continue;
            };

            if exempt.contains(&name) {
                debug!(terminal = %name, "Skipping terminal with active tab");
                continue;
            }

            let Some(idle) = exceeded_idle(
                ResourceKind::Terminal,
                name.as_str(),
                terminal.last_activity.as_ref(),
                now,
                timeout_minutes,
            ) else {
                continue;
            };

            let report = evict(
                ResourceKind::Terminal,
                name.as_str(),
                idle,
                timeout_minutes,
                mode,
                manager.terminate(&name),
            )
            .await;
            reports.push(report);
        }

        reports
    }

    /// Terminate idle terminals, returning the ones that were terminated
    pub async fn run(
        &self,
        now: DateTime<Utc>,
        timeout_minutes: u64,
        exempt: &HashSet<TerminalName>,
    ) -> Vec<TerminalName> {
        let reports = self
            .evaluate(now, timeout_minutes, exempt, CullMode::Execute)
            .await;
        culled_ids(reports).into_iter().map(TerminalName::new).collect()
    }
}

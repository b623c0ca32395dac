//! Events emitted by the culling engine

use culler_api::CullResult;
use std::time::Duration;
use tracing::{info, warn};

/// Events emitted by the culling engine
#[derive(Debug, Clone, PartialEq)]
pub enum CullEvent {
    /// Scheduler attached
    Started { interval_minutes: u64 },

    /// Scheduler detached
    Stopped,

    /// A pass finished
    PassCompleted {
        total: usize,
        kernels: usize,
        terminals: usize,
        sessions: usize,
        workspaces: usize,
        elapsed: Duration,
    },

    /// A scheduled tick found a pass still in flight
    PassSkipped,

    /// Settings changed through the control plane
    SettingsUpdated { interval_changed: bool },
}

impl CullEvent {
    pub(crate) fn pass_completed(result: &CullResult, elapsed: Duration) -> Self {
        CullEvent::PassCompleted {
            total: result.total(),
            kernels: result.kernels_culled.len(),
            terminals: result.terminals_culled.len(),
            sessions: result.sessions_culled.len(),
            workspaces: result.workspaces_culled.len(),
            elapsed,
        }
    }

    /// Write the event to the log
    pub fn log(&self) {
        match self {
            CullEvent::Started { interval_minutes } => {
                info!(interval_minutes, "Culler started");
            }
            CullEvent::Stopped => info!("Culler stopped"),
            CullEvent::PassCompleted {
                total,
                kernels,
                terminals,
                sessions,
                workspaces,
                elapsed,
            } => {
                info!(
                    total,
                    kernels,
                    terminals,
                    sessions,
                    workspaces,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Culling pass complete"
                );
            }
            CullEvent::PassSkipped => warn!("Previous culling pass still running, skipping tick"),
            CullEvent::SettingsUpdated { interval_changed } => {
                info!(interval_changed, "Culler settings updated");
            }
        }
    }
}

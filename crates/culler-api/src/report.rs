//! Report and listing types shared by the culling policies and the CLI

use crate::CullerStatus;
use serde::{Deserialize, Serialize};

/// What happened (or would happen) to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullAction {
    WouldCull,
    Culled,
    Failed,
}

impl CullAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CullAction::WouldCull => "would_cull",
            CullAction::Culled => "culled",
            CullAction::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CullAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an evaluation may evict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    DryRun,
    Execute,
}

impl CullMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            CullMode::DryRun
        } else {
            CullMode::Execute
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, CullMode::DryRun)
    }
}

/// One eligible resource in an evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullReport {
    pub id: String,
    pub idle_time: String,
    pub action: CullAction,
}

/// Output of `culler cull`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullSummary {
    pub kernels_culled: Vec<CullReport>,
    pub terminals_culled: Vec<CullReport>,
    pub sessions_culled: Vec<CullReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces_culled: Option<Vec<CullReport>>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelListing {
    pub id: String,
    pub name: Option<String>,
    pub execution_state: Option<String>,
    pub last_activity: Option<String>,
    pub idle_seconds: f64,
    pub idle_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalListing {
    pub name: String,
    pub last_activity: Option<String>,
    pub idle_seconds: f64,
    pub idle_time: String,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionListing {
    pub id: String,
    pub name: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub session_type: Option<String>,
    pub kernel_id: Option<String>,
    pub kernel_state: Option<String>,
    pub last_activity: Option<String>,
    pub idle_seconds: f64,
    pub idle_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceListing {
    pub id: String,
    pub last_modified: Option<String>,
    pub created: Option<String>,
    pub idle_seconds: f64,
    pub idle_time: String,
}

/// Output of `culler list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceListing {
    pub kernels: Vec<KernelListing>,
    pub terminals: Vec<TerminalListing>,
    pub sessions: Vec<SessionListing>,
    pub workspaces: Vec<WorkspaceListing>,
    /// `None` when the culler endpoints are not reachable
    pub culler: Option<CullerStatus>,
}

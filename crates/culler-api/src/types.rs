//! Control-plane request and response types

use crate::CullerSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifiers evicted in one culling pass.
///
/// All four lists are always present on the wire, so clients written
/// against either the session or the workspace flavour can read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullResult {
    #[serde(default)]
    pub kernels_culled: Vec<String>,
    #[serde(default)]
    pub terminals_culled: Vec<String>,
    #[serde(default)]
    pub sessions_culled: Vec<String>,
    #[serde(default)]
    pub workspaces_culled: Vec<String>,
}

impl CullResult {
    pub fn is_empty(&self) -> bool {
        self.kernels_culled.is_empty()
            && self.terminals_culled.is_empty()
            && self.sessions_culled.is_empty()
            && self.workspaces_culled.is_empty()
    }

    /// Total number of evicted resources across all kinds
    pub fn total(&self) -> usize {
        self.kernels_culled.len()
            + self.terminals_culled.len()
            + self.sessions_culled.len()
            + self.workspaces_culled.len()
    }
}

/// Response of `GET status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullerStatus {
    pub running: bool,
    pub settings: CullerSettings,
}

/// Terminal name to "has an open client tab"
pub type TerminalConnections = BTreeMap<String, bool>;

/// Body of `POST active-terminals`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTerminalsRequest {
    #[serde(default)]
    pub terminals: Vec<String>,
}

/// Workspace listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceView {
    pub id: String,
    pub last_modified: Option<String>,
    pub created: Option<String>,
}

/// `{"status": "ok"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: String,
}

impl StatusOk {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}

impl Default for StatusOk {
    fn default() -> Self {
        Self::ok()
    }
}

/// `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn invalid_json() -> Self {
        Self::new("Invalid JSON")
    }

    pub fn not_initialized() -> Self {
        Self::new("Culler not initialized")
    }
}

//! Resource snapshots as reported by the managers

use culler_util::{ActivityTimestamp, KernelId, SessionId, TerminalName, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Kernel execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Starting,
    Idle,
    Busy,
    Restarting,
    Autorestarting,
    Dead,
    #[serde(other)]
    Unknown,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Starting => "starting",
            ExecutionState::Idle => "idle",
            ExecutionState::Busy => "busy",
            ExecutionState::Restarting => "restarting",
            ExecutionState::Autorestarting => "autorestarting",
            ExecutionState::Dead => "dead",
            ExecutionState::Unknown => "unknown",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ExecutionState::Busy)
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A running kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelInfo {
    pub id: KernelId,
    /// Kernel spec name, e.g. `python3`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub execution_state: Option<ExecutionState>,
    #[serde(default)]
    pub last_activity: Option<ActivityTimestamp>,
}

impl KernelInfo {
    pub fn new(id: impl Into<KernelId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            execution_state: None,
            last_activity: None,
        }
    }

    pub fn with_state(mut self, state: ExecutionState) -> Self {
        self.execution_state = Some(state);
        self
    }

    pub fn with_last_activity(mut self, ts: impl Into<ActivityTimestamp>) -> Self {
        self.last_activity = Some(ts.into());
        self
    }

    pub fn is_busy(&self) -> bool {
        self.execution_state.is_some_and(|s| s.is_busy())
    }
}

/// A server-side terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalInfo {
    #[serde(default)]
    pub name: Option<TerminalName>,
    #[serde(default)]
    pub last_activity: Option<ActivityTimestamp>,
}

impl TerminalInfo {
    pub fn new(name: impl Into<TerminalName>) -> Self {
        Self {
            name: Some(name.into()),
            last_activity: None,
        }
    }

    pub fn with_last_activity(mut self, ts: impl Into<ActivityTimestamp>) -> Self {
        self.last_activity = Some(ts.into());
        self
    }
}

/// Kernel reference nested in a session record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionKernel {
    #[serde(default)]
    pub id: Option<KernelId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub execution_state: Option<ExecutionState>,
    #[serde(default)]
    pub last_activity: Option<ActivityTimestamp>,
}

/// A document-to-kernel binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub id: Option<SessionId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "type")]
    pub session_type: Option<String>,
    #[serde(default)]
    pub kernel: Option<SessionKernel>,
}

impl SessionInfo {
    pub fn new(id: impl Into<SessionId>, kernel_id: impl Into<KernelId>) -> Self {
        Self {
            id: Some(id.into()),
            kernel: Some(SessionKernel {
                id: Some(kernel_id.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn kernel_id(&self) -> Option<&KernelId> {
        self.kernel.as_ref().and_then(|k| k.id.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub id: WorkspaceId,
    #[serde(default)]
    pub last_modified: Option<ActivityTimestamp>,
    #[serde(default)]
    pub created: Option<ActivityTimestamp>,
}

/// A persisted workspace layout record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub metadata: WorkspaceMetadata,
}

impl WorkspaceEntry {
    pub fn new(id: impl Into<WorkspaceId>) -> Self {
        Self {
            metadata: WorkspaceMetadata {
                id: id.into(),
                last_modified: None,
                created: None,
            },
        }
    }

    pub fn with_last_modified(mut self, ts: impl Into<ActivityTimestamp>) -> Self {
        self.metadata.last_modified = Some(ts.into());
        self
    }

    pub fn id(&self) -> &WorkspaceId {
        &self.metadata.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kernel_parses_server_model() {
        let kernel: KernelInfo = serde_json::from_value(json!({
            "id": "3f1c2a7e-0000-4000-8000-000000000001",
            "name": "python3",
            "last_activity": "2024-05-01T10:00:00.000000Z",
            "execution_state": "idle",
            "connections": 1
        }))
        .unwrap();
        assert_eq!(kernel.execution_state, Some(ExecutionState::Idle));
        assert!(!kernel.is_busy());
        assert!(kernel.last_activity.unwrap().to_utc().is_ok());
    }

    #[test]
    fn unknown_state_is_not_busy() {
        let kernel: KernelInfo =
            serde_json::from_value(json!({"id": "k", "execution_state": "weird"})).unwrap();
        assert_eq!(kernel.execution_state, Some(ExecutionState::Unknown));
        assert!(!kernel.is_busy());
    }

    #[test]
    fn session_exposes_nested_kernel_id() {
        let session: SessionInfo = serde_json::from_value(json!({
            "id": "s1",
            "path": "work/analysis.ipynb",
            "type": "notebook",
            "kernel": {"id": "k1", "execution_state": "busy"}
        }))
        .unwrap();
        assert_eq!(session.kernel_id().map(|k| k.as_str()), Some("k1"));
        assert_eq!(session.session_type.as_deref(), Some("notebook"));
    }

    #[test]
    fn session_without_kernel() {
        let session: SessionInfo = serde_json::from_value(json!({"id": "s2"})).unwrap();
        assert!(session.kernel_id().is_none());
    }
}

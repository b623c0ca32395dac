//! Manager traits the culler evicts through

use async_trait::async_trait;
use culler_util::{KernelId, SessionId, TerminalName, WorkspaceId};
use thiserror::Error;

use crate::{KernelInfo, SessionInfo, TerminalInfo, WorkspaceEntry};

/// Errors from manager operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Manager unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Kernel manager
#[async_trait]
pub trait KernelManager: Send + Sync {
    async fn list_kernel_ids(&self) -> HostResult<Vec<KernelId>>;

    /// `Ok(None)` if the kernel is gone
    async fn get_kernel(&self, id: &KernelId) -> HostResult<Option<KernelInfo>>;

    async fn shutdown_kernel(&self, id: &KernelId) -> HostResult<()>;
}

/// Terminal manager
#[async_trait]
pub trait TerminalManager: Send + Sync {
    async fn list(&self) -> HostResult<Vec<TerminalInfo>>;

    async fn terminate(&self, name: &TerminalName) -> HostResult<()>;
}

/// Session manager
#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn list_sessions(&self) -> HostResult<Vec<SessionInfo>>;

    async fn delete_session(&self, id: &SessionId) -> HostResult<()>;
}

/// Workspace manager
#[async_trait]
pub trait WorkspaceManager: Send + Sync {
    async fn list_workspaces(&self) -> HostResult<Vec<WorkspaceEntry>>;

    async fn delete(&self, id: &WorkspaceId) -> HostResult<()>;
}

//! Bundle of managers handed to the culling core

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{HostResult, KernelManager, SessionManager, TerminalManager, WorkspaceManager};

/// One-time acquisition of a workspace manager
#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    async fn acquire(&self) -> HostResult<Arc<dyn WorkspaceManager>>;
}

/// Lazily acquired workspace manager.
///
/// The first call to [`WorkspaceSource::get`] runs the provider; its outcome,
/// including failure, is cached for the lifetime of the source.
pub struct WorkspaceSource {
    provider: Option<Arc<dyn WorkspaceProvider>>,
    cell: OnceCell<Option<Arc<dyn WorkspaceManager>>>,
}

impl WorkspaceSource {
    pub fn new(provider: Arc<dyn WorkspaceProvider>) -> Self {
        Self {
            provider: Some(provider),
            cell: OnceCell::new(),
        }
    }

    /// Source that is already resolved to `manager`
    pub fn ready(manager: Arc<dyn WorkspaceManager>) -> Self {
        Self {
            provider: None,
            cell: OnceCell::new_with(Some(Some(manager))),
        }
    }

    /// Source for hosts without workspace support
    pub fn unavailable() -> Self {
        Self {
            provider: None,
            cell: OnceCell::new_with(Some(None)),
        }
    }

    pub async fn get(&self) -> Option<Arc<dyn WorkspaceManager>> {
        self.cell
            .get_or_init(|| async {
                let provider = self.provider.as_ref()?;
                match provider.acquire().await {
                    Ok(manager) => {
                        debug!("Workspace manager acquired");
                        Some(manager)
                    }
                    Err(e) => {
                        warn!(error = %e, "Workspace manager not available");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Whether acquisition has already run
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

impl std::fmt::Debug for WorkspaceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSource")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Managers the culler operates on.
///
/// Kernel and session managers are required. The terminal manager is an
/// optional handle resolved once by whoever builds the bundle.
pub struct HostManagers {
    pub kernels: Arc<dyn KernelManager>,
    pub terminals: Option<Arc<dyn TerminalManager>>,
    pub sessions: Arc<dyn SessionManager>,
    pub workspaces: WorkspaceSource,
}

impl HostManagers {
    pub fn new(kernels: Arc<dyn KernelManager>, sessions: Arc<dyn SessionManager>) -> Self {
        Self {
            kernels,
            terminals: None,
            sessions,
            workspaces: WorkspaceSource::unavailable(),
        }
    }

    pub fn with_terminals(mut self, terminals: Arc<dyn TerminalManager>) -> Self {
        self.terminals = Some(terminals);
        self
    }

    pub fn with_workspaces(mut self, workspaces: WorkspaceSource) -> Self {
        self.workspaces = workspaces;
        self
    }
}

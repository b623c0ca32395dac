//! Manager implementations backed by the Jupyter REST API

use async_trait::async_trait;
use culler_host_api::{
    HostManagers, HostResult, KernelInfo, KernelManager, SessionInfo, SessionManager,
    TerminalInfo, TerminalManager, WorkspaceEntry, WorkspaceManager, WorkspaceProvider,
    WorkspaceSource,
};
use culler_util::{KernelId, SessionId, TerminalName, WorkspaceId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::JupyterClient;

/// Jupyter server as a host for the culler
#[derive(Debug, Clone)]
pub struct JupyterHost {
    client: JupyterClient,
}

impl JupyterHost {
    pub fn new(client: JupyterClient) -> Arc<Self> {
        Arc::new(Self { client })
    }

    pub fn client(&self) -> &JupyterClient {
        &self.client
    }

    /// Build the manager bundle.
    ///
    /// Terminal support is checked once here; a server with terminals disabled
    /// answers 404. The workspace manager is acquired on first use.
    pub async fn managers(self: &Arc<Self>) -> HostManagers {
        let mut managers = HostManagers::new(self.clone(), self.clone())
            .with_workspaces(WorkspaceSource::new(self.clone()));

        match self.client.list_terminals().await {
            Err(e) if e.is_not_found() => {
                warn!("Terminals are disabled on the Jupyter server");
            }
            Err(e) => {
                warn!(error = %e, "Could not check terminal support, assuming available");
                managers = managers.with_terminals(self.clone());
            }
            Ok(_) => {
                managers = managers.with_terminals(self.clone());
            }
        }

        managers
    }
}

#[async_trait]
impl KernelManager for JupyterHost {
    async fn list_kernel_ids(&self) -> HostResult<Vec<KernelId>> {
        let kernels = self.client.list_kernels().await?;
        Ok(kernels.into_iter().map(|k| k.id).collect())
    }

    async fn get_kernel(&self, id: &KernelId) -> HostResult<Option<KernelInfo>> {
        Ok(self.client.get_kernel(id).await?)
    }

    async fn shutdown_kernel(&self, id: &KernelId) -> HostResult<()> {
        Ok(self.client.shutdown_kernel(id).await?)
    }
}

#[async_trait]
impl TerminalManager for JupyterHost {
    async fn list(&self) -> HostResult<Vec<TerminalInfo>> {
        Ok(self.client.list_terminals().await?)
    }

    async fn terminate(&self, name: &TerminalName) -> HostResult<()> {
        Ok(self.client.terminate_terminal(name).await?)
    }
}

#[async_trait]
impl SessionManager for JupyterHost {
    async fn list_sessions(&self) -> HostResult<Vec<SessionInfo>> {
        Ok(self.client.list_sessions().await?)
    }

    async fn delete_session(&self, id: &SessionId) -> HostResult<()> {
        Ok(self.client.delete_session(id).await?)
    }
}

#[async_trait]
impl WorkspaceManager for JupyterHost {
    async fn list_workspaces(&self) -> HostResult<Vec<WorkspaceEntry>> {
        Ok(self.client.list_workspaces().await?)
    }

    async fn delete(&self, id: &WorkspaceId) -> HostResult<()> {
        Ok(self.client.delete_workspace(id).await?)
    }
}

/// Lists the workspaces endpoint; servers without JupyterLab lack it
#[async_trait]
impl WorkspaceProvider for JupyterHost {
    async fn acquire(&self) -> HostResult<Arc<dyn WorkspaceManager>> {
        self.client.list_workspaces().await?;
        info!("Workspace API available");
        Ok(Arc::new(self.clone()))
    }
}

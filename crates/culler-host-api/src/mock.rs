//! Mock managers for testing

use async_trait::async_trait;
use culler_util::{KernelId, SessionId, TerminalName, WorkspaceId};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::{
    HostError, HostManagers, HostResult, KernelInfo, KernelManager, SessionInfo, SessionManager,
    TerminalInfo, TerminalManager, WorkspaceEntry, WorkspaceManager, WorkspaceSource,
};

/// In-memory kernel manager that records shutdowns
#[derive(Default)]
pub struct MockKernelManager {
    kernels: Arc<Mutex<BTreeMap<KernelId, KernelInfo>>>,
    shutdowns: Arc<Mutex<Vec<KernelId>>>,

    /// Make `list_kernel_ids` fail
    pub fail_list: Arc<Mutex<bool>>,

    /// Kernels whose `get_kernel` fails
    pub fail_get: Arc<Mutex<HashSet<KernelId>>>,

    /// Kernels whose shutdown fails
    pub fail_shutdown: Arc<Mutex<HashSet<KernelId>>>,
}

impl MockKernelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kernel: KernelInfo) {
        self.kernels.lock().unwrap().insert(kernel.id.clone(), kernel);
    }

    /// Kernel ids passed to `shutdown_kernel`, in call order
    pub fn shutdown_calls(&self) -> Vec<KernelId> {
        self.shutdowns.lock().unwrap().clone()
    }

    pub fn running(&self) -> Vec<KernelId> {
        self.kernels.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl KernelManager for MockKernelManager {
    async fn list_kernel_ids(&self) -> HostResult<Vec<KernelId>> {
        if *self.fail_list.lock().unwrap() {
            return Err(HostError::Request("Mock list failure".into()));
        }
        Ok(self.running())
    }

    async fn get_kernel(&self, id: &KernelId) -> HostResult<Option<KernelInfo>> {
        if self.fail_get.lock().unwrap().contains(id) {
            return Err(HostError::Request(format!("Mock get failure for {}", id)));
        }
        Ok(self.kernels.lock().unwrap().get(id).cloned())
    }

    async fn shutdown_kernel(&self, id: &KernelId) -> HostResult<()> {
        self.shutdowns.lock().unwrap().push(id.clone());
        if self.fail_shutdown.lock().unwrap().contains(id) {
            return Err(HostError::Request(format!("Mock shutdown failure for {}", id)));
        }
        match self.kernels.lock().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(HostError::NotFound(id.to_string())),
        }
    }
}

/// In-memory terminal manager that records terminations
#[derive(Default)]
pub struct MockTerminalManager {
    terminals: Arc<Mutex<Vec<TerminalInfo>>>,
    terminations: Arc<Mutex<Vec<TerminalName>>>,

    pub fail_list: Arc<Mutex<bool>>,
    pub fail_terminate: Arc<Mutex<HashSet<TerminalName>>>,
}

impl MockTerminalManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, terminal: TerminalInfo) {
        self.terminals.lock().unwrap().push(terminal);
    }

    pub fn terminate_calls(&self) -> Vec<TerminalName> {
        self.terminations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TerminalManager for MockTerminalManager {
    async fn list(&self) -> HostResult<Vec<TerminalInfo>> {
        if *self.fail_list.lock().unwrap() {
            return Err(HostError::Request("Mock list failure".into()));
        }
        Ok(self.terminals.lock().unwrap().clone())
    }

    async fn terminate(&self, name: &TerminalName) -> HostResult<()> {
        self.terminations.lock().unwrap().push(name.clone());
        if self.fail_terminate.lock().unwrap().contains(name) {
            return Err(HostError::Request(format!("Mock terminate failure for {}", name)));
        }
        self.terminals
            .lock()
            .unwrap()
            .retain(|t| t.name.as_ref() != Some(name));
        Ok(())
    }
}

/// In-memory session manager that records deletions
#[derive(Default)]
pub struct MockSessionManager {
    sessions: Arc<Mutex<Vec<SessionInfo>>>,
    deletions: Arc<Mutex<Vec<SessionId>>>,

    pub fail_list: Arc<Mutex<bool>>,
    pub fail_delete: Arc<Mutex<HashSet<SessionId>>>,
}

impl MockSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: SessionInfo) {
        self.sessions.lock().unwrap().push(session);
    }

    pub fn delete_calls(&self) -> Vec<SessionId> {
        self.deletions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionManager for MockSessionManager {
    async fn list_sessions(&self) -> HostResult<Vec<SessionInfo>> {
        if *self.fail_list.lock().unwrap() {
            return Err(HostError::Request("Mock list failure".into()));
        }
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn delete_session(&self, id: &SessionId) -> HostResult<()> {
        self.deletions.lock().unwrap().push(id.clone());
        if self.fail_delete.lock().unwrap().contains(id) {
            return Err(HostError::Request(format!("Mock delete failure for {}", id)));
        }
        self.sessions
            .lock()
            .unwrap()
            .retain(|s| s.id.as_ref() != Some(id));
        Ok(())
    }
}

/// In-memory workspace manager that records deletions
#[derive(Default)]
pub struct MockWorkspaceManager {
    workspaces: Arc<Mutex<Vec<WorkspaceEntry>>>,
    deletions: Arc<Mutex<Vec<WorkspaceId>>>,

    pub fail_list: Arc<Mutex<bool>>,
    pub fail_delete: Arc<Mutex<HashSet<WorkspaceId>>>,
}

impl MockWorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, workspace: WorkspaceEntry) {
        self.workspaces.lock().unwrap().push(workspace);
    }

    pub fn delete_calls(&self) -> Vec<WorkspaceId> {
        self.deletions.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspaceManager for MockWorkspaceManager {
    async fn list_workspaces(&self) -> HostResult<Vec<WorkspaceEntry>> {
        if *self.fail_list.lock().unwrap() {
            return Err(HostError::Request("Mock list failure".into()));
        }
        Ok(self.workspaces.lock().unwrap().clone())
    }

    async fn delete(&self, id: &WorkspaceId) -> HostResult<()> {
        self.deletions.lock().unwrap().push(id.clone());
        if self.fail_delete.lock().unwrap().contains(id) {
            return Err(HostError::Request(format!("Mock delete failure for {}", id)));
        }
        self.workspaces.lock().unwrap().retain(|w| w.id() != id);
        Ok(())
    }
}

/// All four mock managers, wired into a [`HostManagers`] on demand
#[derive(Default, Clone)]
pub struct MockHost {
    pub kernels: Arc<MockKernelManager>,
    pub terminals: Arc<MockTerminalManager>,
    pub sessions: Arc<MockSessionManager>,
    pub workspaces: Arc<MockWorkspaceManager>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle with every manager available
    pub fn managers(&self) -> HostManagers {
        HostManagers::new(self.kernels.clone(), self.sessions.clone())
            .with_terminals(self.terminals.clone())
            .with_workspaces(WorkspaceSource::ready(self.workspaces.clone()))
    }

    /// Bundle without terminal or workspace support
    pub fn managers_minimal(&self) -> HostManagers {
        HostManagers::new(self.kernels.clone(), self.sessions.clone())
    }
}

//! Response shapes of Jupyter server endpoints not covered by the snapshot types

use culler_host_api::WorkspaceEntry;
use serde::Deserialize;

/// `GET lab/api/workspaces`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceListResponse {
    #[serde(default)]
    pub workspaces: WorkspaceList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceList {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub values: Vec<WorkspaceEntry>,
}

/// One line of `jupyter server list --json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunningServer {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

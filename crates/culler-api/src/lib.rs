//! Wire types for the idle culler control plane
//!
//! This crate defines the stable API between the culler and its clients:
//! - Settings and partial settings updates
//! - Cull results and status snapshots
//! - Listing and report types shared by the HTTP surface and the CLI
//! - Route names

mod report;
mod settings;
mod types;

pub use report::*;
pub use settings::*;
pub use types::*;

/// URL namespace under which the control-plane routes are mounted
pub const API_NAMESPACE: &str = "jupyterlab-kernel-terminal-workspace-culler-extension";

/// Route names below [`API_NAMESPACE`]
pub mod routes {
    pub const SETTINGS: &str = "settings";
    pub const STATUS: &str = "status";
    pub const CULL_RESULT: &str = "cull-result";
    pub const TERMINALS_CONNECTION: &str = "terminals-connection";
    pub const ACTIVE_TERMINALS: &str = "active-terminals";
    pub const WORKSPACES: &str = "workspaces";
}

/// Join a server base URL path with the namespace and a route name
pub fn namespaced_path(base_url: &str, route: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{}/{}/{}", base, API_NAMESPACE, route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_path_joins_cleanly() {
        assert_eq!(
            namespaced_path("/", routes::STATUS),
            "/jupyterlab-kernel-terminal-workspace-culler-extension/status"
        );
        assert_eq!(
            namespaced_path("/user/alice/", routes::SETTINGS),
            "/user/alice/jupyterlab-kernel-terminal-workspace-culler-extension/settings"
        );
    }
}

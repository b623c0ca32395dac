//! `culler list`

use chrono::{DateTime, Utc};
use culler_api::{
    CullerStatus, KernelListing, ResourceListing, SessionListing, TerminalConnections,
    TerminalListing, WorkspaceListing,
};
use culler_host_api::{KernelInfo, SessionInfo, TerminalInfo, WorkspaceEntry};
use culler_host_jupyter::{ClientResult, JupyterClient};
use culler_util::{ActivityTimestamp, NO_ACTIVITY, format_idle_since, idle_seconds, short_id};
use std::fmt::Write;
use tracing::debug;

use crate::RULE;

const MAX_PATH_WIDTH: usize = 40;

/// Everything `list` shows, as fetched from the server
#[derive(Debug, Default)]
pub struct Snapshot {
    pub kernels: Vec<KernelInfo>,
    pub terminals: Vec<TerminalInfo>,
    pub sessions: Vec<SessionInfo>,
    pub workspaces: Vec<WorkspaceEntry>,
    pub culler: Option<CullerStatus>,
    pub connections: TerminalConnections,
}

/// Fetch the snapshot. Kernel and session listing failures are fatal;
/// optional sources degrade to empty. `culler` serves the namespace routes
/// and may be the Jupyter server itself.
pub async fn fetch_snapshot(
    client: &JupyterClient,
    culler: &JupyterClient,
) -> ClientResult<Snapshot> {
    let kernels = client.list_kernels().await?;

    let terminals = match client.list_terminals().await {
        Ok(terminals) => terminals,
        Err(e) if e.is_not_found() => {
            debug!("Terminals disabled on server");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    let sessions = client.list_sessions().await?;

    let workspaces = client.list_workspaces().await.unwrap_or_else(|e| {
        debug!(error = %e, "Workspaces not available");
        Vec::new()
    });

    let status = culler
        .culler_status()
        .await
        .inspect_err(|e| debug!(error = %e, "Culler extension not reachable"))
        .ok();

    let connections = culler.terminals_connection().await.unwrap_or_default();

    Ok(Snapshot {
        kernels,
        terminals,
        sessions,
        workspaces,
        culler: status,
        connections,
    })
}

fn idle_fields(last_activity: Option<&ActivityTimestamp>, now: DateTime<Utc>) -> (f64, String) {
    let seconds = idle_seconds(last_activity, now).unwrap_or(NO_ACTIVITY);
    (seconds, format_idle_since(last_activity, now))
}

/// Compute idle times for every resource in the snapshot
pub fn build_listing(snapshot: Snapshot, now: DateTime<Utc>) -> ResourceListing {
    let kernels = snapshot
        .kernels
        .into_iter()
        .map(|k| {
            let (idle_seconds, idle_time) = idle_fields(k.last_activity.as_ref(), now);
            KernelListing {
                id: k.id.to_string(),
                name: k.name,
                execution_state: k.execution_state.map(|s| s.as_str().to_string()),
                last_activity: k.last_activity.map(|t| t.to_string()),
                idle_seconds,
                idle_time,
            }
        })
        .collect();

    let connections = &snapshot.connections;
    let terminals = snapshot
        .terminals
        .into_iter()
        .filter_map(|t| {
            let name = t.name?.to_string();
            let (idle_seconds, idle_time) = idle_fields(t.last_activity.as_ref(), now);
            Some(TerminalListing {
                connected: connections.get(&name).copied().unwrap_or(false),
                name,
                last_activity: t.last_activity.map(|ts| ts.to_string()),
                idle_seconds,
                idle_time,
            })
        })
        .collect();

    let sessions = snapshot
        .sessions
        .into_iter()
        .filter_map(|s| {
            let id = s.id?.to_string();
            let kernel = s.kernel.unwrap_or_default();
            let (idle_seconds, idle_time) = idle_fields(kernel.last_activity.as_ref(), now);
            Some(SessionListing {
                id,
                name: s.name,
                path: s.path,
                session_type: s.session_type,
                kernel_id: kernel.id.map(|k| k.to_string()),
                kernel_state: kernel.execution_state.map(|st| st.as_str().to_string()),
                last_activity: kernel.last_activity.map(|t| t.to_string()),
                idle_seconds,
                idle_time,
            })
        })
        .collect();

    let workspaces = snapshot
        .workspaces
        .into_iter()
        .map(|w| {
            let meta = w.metadata;
            let (idle_seconds, idle_time) = idle_fields(meta.last_modified.as_ref(), now);
            WorkspaceListing {
                id: meta.id.to_string(),
                last_modified: meta.last_modified.map(|t| t.to_string()),
                created: meta.created.map(|t| t.to_string()),
                idle_seconds,
                idle_time,
            }
        })
        .collect();

    ResourceListing {
        kernels,
        terminals,
        sessions,
        workspaces,
        culler: snapshot.culler,
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

fn truncate_path(path: &str) -> String {
    let count = path.chars().count();
    if count <= MAX_PATH_WIDTH {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - (MAX_PATH_WIDTH - 3)).collect();
    format!("...{}", tail)
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", title);
    let _ = writeln!(out, "{}", RULE);
}

/// Human-readable rendering
pub fn render_listing(listing: &ResourceListing) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "CULLER SETTINGS");
    let _ = writeln!(out, "{}", RULE);
    match &listing.culler {
        Some(status) => {
            let s = &status.settings;
            let _ = writeln!(
                out,
                "  Status: {}",
                if status.running { "running" } else { "stopped" }
            );
            let _ = writeln!(out, "  Check interval: {} min", s.cull_check_interval);
            let _ = writeln!(
                out,
                "  Kernel culling: {}, timeout: {} min",
                on_off(s.kernel_cull_enabled),
                s.kernel_cull_idle_timeout
            );
            let _ = writeln!(
                out,
                "  Terminal culling: {}, timeout: {} min, disconnected-only: {}",
                on_off(s.terminal_cull_enabled),
                s.terminal_cull_idle_timeout,
                s.terminal_cull_disconnected_only
            );
            let _ = writeln!(
                out,
                "  Session culling: {}, timeout: {} min",
                on_off(s.session_cull_enabled),
                s.session_cull_idle_timeout
            );
            let _ = writeln!(
                out,
                "  Workspace culling: {}, timeout: {} min",
                on_off(s.workspace_cull_enabled),
                s.workspace_cull_idle_timeout
            );
        }
        None => {
            let _ = writeln!(out, "  (culler extension not available)");
        }
    }

    section(&mut out, "KERNELS");
    if listing.kernels.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for k in &listing.kernels {
        let state = k.execution_state.as_deref().unwrap_or("unknown");
        let _ = writeln!(
            out,
            "  {}  {:8}  idle: {:>8}  ({})",
            short_id(&k.id),
            state,
            k.idle_time,
            k.name.as_deref().unwrap_or("None")
        );
    }

    section(&mut out, "TERMINALS");
    if listing.terminals.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for t in &listing.terminals {
        let connection = if t.connected { "connected" } else { "disconnected" };
        let _ = writeln!(out, "  {:8}  {:12}  idle: {:>8}", t.name, connection, t.idle_time);
    }

    section(&mut out, "SESSIONS");
    if listing.sessions.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for s in &listing.sessions {
        let state = s.kernel_state.as_deref().unwrap_or("unknown");
        let path = truncate_path(s.path.as_deref().unwrap_or("(no path)"));
        let _ = writeln!(
            out,
            "  {}  {:8}  idle: {:>8}  {}",
            short_id(&s.id),
            state,
            s.idle_time,
            path
        );
    }

    section(&mut out, "WORKSPACES");
    if listing.workspaces.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for w in &listing.workspaces {
        let _ = writeln!(out, "  {:20}  idle: {:>8}", w.id, w.idle_time);
    }

    out
}

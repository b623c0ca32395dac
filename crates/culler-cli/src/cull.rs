//! `culler cull`

use chrono::{DateTime, Utc};
use culler_api::{CullMode, CullReport, CullSummary};
use culler_core::{KernelPolicy, SessionPolicy, TerminalPolicy, WorkspacePolicy};
use culler_host_api::HostManagers;
use culler_host_jupyter::{ClientResult, JupyterClient, JupyterHost};
use culler_util::short_id;
use std::collections::HashSet;
use std::fmt::Write;
use tracing::debug;

/// Timeouts in minutes for one manual cull
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CullOptions {
    pub dry_run: bool,
    pub kernel_timeout: u64,
    pub terminal_timeout: u64,
    pub session_timeout: u64,
    /// Workspaces are only evaluated when set
    pub workspace_timeout: Option<u64>,
}

/// Evaluate every kind against the given timeouts.
///
/// Terminals are judged on idle time alone; the active-terminal registry
/// lives in the server, not here.
pub async fn run_cull(
    managers: &HostManagers,
    options: &CullOptions,
    now: DateTime<Utc>,
) -> CullSummary {
    let mode = CullMode::from_dry_run(options.dry_run);

    let kernels_culled = KernelPolicy::new(managers.kernels.as_ref())
        .evaluate(now, options.kernel_timeout, mode)
        .await;

    let terminals_culled = TerminalPolicy::new(managers.terminals.as_deref())
        .evaluate(now, options.terminal_timeout, &HashSet::new(), mode)
        .await;

    let sessions_culled = SessionPolicy::new(managers.sessions.as_ref(), managers.kernels.as_ref())
        .evaluate(now, options.session_timeout, mode)
        .await;

    let workspaces_culled = match options.workspace_timeout {
        Some(timeout) => Some(
            WorkspacePolicy::new(&managers.workspaces)
                .evaluate(now, timeout, mode)
                .await,
        ),
        None => None,
    };

    CullSummary {
        kernels_culled,
        terminals_culled,
        sessions_culled,
        workspaces_culled,
        dry_run: options.dry_run,
    }
}

/// A 404 marks an API the server does not run
fn optional<T>(listing: ClientResult<T>, kind: &str) -> ClientResult<()> {
    match listing {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(kind, "Listing disabled on server");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Fetch every listing the cull will touch. The policies log and skip
/// listing failures, so a broken server would otherwise look idle-free.
pub async fn check_listings(client: &JupyterClient, options: &CullOptions) -> ClientResult<()> {
    client.list_kernels().await?;
    optional(client.list_terminals().await, "terminals")?;
    client.list_sessions().await?;
    if options.workspace_timeout.is_some() {
        optional(client.list_workspaces().await, "workspaces")?;
    }
    Ok(())
}

/// Cull against a live server
pub async fn execute(
    client: JupyterClient,
    options: &CullOptions,
    now: DateTime<Utc>,
) -> ClientResult<CullSummary> {
    check_listings(&client, options).await?;

    let host = JupyterHost::new(client);
    let managers = host.managers().await;
    Ok(run_cull(&managers, options, now).await)
}

fn render_kind(
    out: &mut String,
    prefix: &str,
    plural: &str,
    reports: &[CullReport],
    shorten: bool,
) {
    if reports.is_empty() {
        let _ = writeln!(out, "{}No {} to cull", prefix, plural.to_lowercase());
        return;
    }

    let _ = writeln!(out, "{}{} culled:", prefix, plural);
    for report in reports {
        let id = if shorten { short_id(&report.id) } else { &report.id };
        let _ = writeln!(out, "  {}  idle: {}  ({})", id, report.idle_time, report.action);
    }
}

/// Human-readable rendering
pub fn render_summary(summary: &CullSummary) -> String {
    let prefix = if summary.dry_run { "[DRY RUN] " } else { "" };
    let mut out = String::new();

    render_kind(&mut out, prefix, "Kernels", &summary.kernels_culled, true);
    render_kind(&mut out, prefix, "Terminals", &summary.terminals_culled, false);
    render_kind(&mut out, prefix, "Sessions", &summary.sessions_culled, true);
    if let Some(workspaces) = &summary.workspaces_culled {
        render_kind(&mut out, prefix, "Workspaces", workspaces, false);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use culler_api::CullAction;
    use culler_host_api::{
        ExecutionState, KernelInfo, MockHost, SessionInfo, TerminalInfo, WorkspaceEntry,
    };
    use culler_util::{KernelId, TerminalName, WorkspaceId};
    use axum::http::StatusCode;

    use crate::test_server::{self, Listings};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn options(dry_run: bool) -> CullOptions {
        CullOptions {
            dry_run,
            kernel_timeout: 60,
            terminal_timeout: 60,
            session_timeout: 10080,
            workspace_timeout: None,
        }
    }

    fn host() -> MockHost {
        let host = MockHost::new();
        let now = now();
        host.kernels.insert(
            KernelInfo::new("aaaaaaaa-1111")
                .with_state(ExecutionState::Idle)
                .with_last_activity(now - Duration::hours(2)),
        );
        host.kernels.insert(
            KernelInfo::new("bbbbbbbb-2222")
                .with_state(ExecutionState::Busy)
                .with_last_activity(now - Duration::hours(5)),
        );
        host.terminals
            .insert(TerminalInfo::new("1").with_last_activity(now - Duration::hours(3)));
        host.terminals
            .insert(TerminalInfo::new("2").with_last_activity(now - Duration::minutes(3)));
        host.workspaces
            .insert(WorkspaceEntry::new("default").with_last_modified(now - Duration::days(30)));
        host.workspaces
            .insert(WorkspaceEntry::new("lab-old").with_last_modified(now - Duration::days(30)));
        host
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_evicting() {
        let host = host();
        let summary = run_cull(&host.managers(), &options(true), now()).await;

        assert!(summary.dry_run);
        assert_eq!(summary.kernels_culled.len(), 1);
        assert_eq!(summary.kernels_culled[0].id, "aaaaaaaa-1111");
        assert_eq!(summary.kernels_culled[0].action, CullAction::WouldCull);
        assert_eq!(summary.kernels_culled[0].idle_time, "2.0h");
        assert_eq!(summary.terminals_culled.len(), 1);
        assert_eq!(summary.terminals_culled[0].id, "1");
        assert!(summary.workspaces_culled.is_none());

        assert!(host.kernels.shutdown_calls().is_empty());
        assert!(host.terminals.terminate_calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_evicts() {
        let host = host();
        let summary = run_cull(&host.managers(), &options(false), now()).await;

        assert_eq!(summary.kernels_culled[0].action, CullAction::Culled);
        assert_eq!(host.kernels.shutdown_calls(), vec![KernelId::new("aaaaaaaa-1111")]);
        assert_eq!(host.terminals.terminate_calls(), vec![TerminalName::new("1")]);
    }

    #[tokio::test]
    async fn test_failed_eviction_is_reported() {
        let host = host();
        host.kernels
            .fail_shutdown
            .lock()
            .unwrap()
            .insert(KernelId::new("aaaaaaaa-1111"));

        let summary = run_cull(&host.managers(), &options(false), now()).await;
        assert_eq!(summary.kernels_culled[0].action, CullAction::Failed);
    }

    #[tokio::test]
    async fn test_workspaces_only_with_timeout() {
        let host = host();
        let opts = CullOptions {
            workspace_timeout: Some(10080),
            ..options(false)
        };
        let summary = run_cull(&host.managers(), &opts, now()).await;

        let workspaces = summary.workspaces_culled.unwrap();
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].id, "lab-old");
        assert_eq!(host.workspaces.delete_calls(), vec![WorkspaceId::new("lab-old")]);
    }

    #[tokio::test]
    async fn test_session_follows_kernel_idle() {
        let host = MockHost::new();
        host.kernels.insert(
            KernelInfo::new("k1")
                .with_state(ExecutionState::Idle)
                .with_last_activity(now() - Duration::days(8)),
        );
        host.sessions.insert(SessionInfo::new("s1", "k1"));
        let opts = CullOptions {
            kernel_timeout: 20000,
            ..options(true)
        };

        let summary = run_cull(&host.managers(), &opts, now()).await;
        assert!(summary.kernels_culled.is_empty());
        assert_eq!(summary.sessions_culled.len(), 1);
        assert_eq!(summary.sessions_culled[0].id, "s1");
    }

    async fn client(listings: Listings) -> JupyterClient {
        JupyterClient::new(&test_server::jupyter(listings).await, None).unwrap()
    }

    #[tokio::test]
    async fn test_failing_session_listing_aborts_cull() {
        let client = client(Listings {
            sessions: StatusCode::INTERNAL_SERVER_ERROR,
            ..Default::default()
        })
        .await;

        let err = execute(client, &options(false), now()).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.to_string().contains("api/sessions"));
    }

    #[tokio::test]
    async fn test_failing_terminal_listing_aborts_cull() {
        let client = client(Listings {
            terminals: StatusCode::BAD_GATEWAY,
            ..Default::default()
        })
        .await;

        let err = execute(client, &options(true), now()).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn test_disabled_terminals_still_cull() {
        let client = client(Listings {
            terminals: StatusCode::NOT_FOUND,
            ..Default::default()
        })
        .await;

        let summary = execute(client, &options(false), now()).await.unwrap();
        assert!(summary.terminals_culled.is_empty());
        assert!(summary.workspaces_culled.is_none());
    }

    #[tokio::test]
    async fn test_workspace_listing_checked_only_with_timeout() {
        let listings = Listings {
            workspaces: StatusCode::INTERNAL_SERVER_ERROR,
            ..Default::default()
        };

        let summary = execute(client(listings).await, &options(false), now())
            .await
            .unwrap();
        assert!(summary.workspaces_culled.is_none());

        let mut with_workspaces = options(false);
        with_workspaces.workspace_timeout = Some(60);
        let err = execute(client(listings).await, &with_workspaces, now())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_missing_lab_skips_workspaces() {
        let client = client(Listings {
            workspaces: StatusCode::NOT_FOUND,
            ..Default::default()
        })
        .await;
        let mut with_workspaces = options(false);
        with_workspaces.workspace_timeout = Some(60);

        let summary = execute(client, &with_workspaces, now()).await.unwrap();
        assert_eq!(summary.workspaces_culled, Some(vec![]));
    }

    #[test]
    fn test_render_summary() {
        let summary = CullSummary {
            kernels_culled: vec![CullReport {
                id: "0123456789abcdef".into(),
                idle_time: "2.0h".into(),
                action: CullAction::WouldCull,
            }],
            terminals_culled: vec![CullReport {
                id: "terminal-12".into(),
                idle_time: "3.0h".into(),
                action: CullAction::WouldCull,
            }],
            sessions_culled: vec![],
            workspaces_culled: None,
            dry_run: true,
        };

        assert_eq!(
            render_summary(&summary),
            "[DRY RUN] Kernels culled:\n\
             \x20 01234567  idle: 2.0h  (would_cull)\n\
             [DRY RUN] Terminals culled:\n\
             \x20 terminal-12  idle: 3.0h  (would_cull)\n\
             [DRY RUN] No sessions to cull\n"
        );
    }

    #[test]
    fn test_render_summary_workspaces() {
        let summary = CullSummary {
            workspaces_culled: Some(vec![]),
            ..Default::default()
        };
        let out = render_summary(&summary);
        assert!(out.starts_with("No kernels to cull\n"));
        assert!(out.ends_with("No workspaces to cull\n"));
    }
}

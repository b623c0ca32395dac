//! Locating the Jupyter server and its API token

use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::RunningServer;

/// Port assumed when neither the registry nor `JUPYTER_PORT` says otherwise
pub const DEFAULT_JUPYTER_PORT: &str = "8888";

/// How long `jupyter server list` may take
pub const SERVER_LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variables consulted for a token, highest priority first
pub const TOKEN_ENV_VARS: &[&str] = &["JUPYTERHUB_API_TOKEN", "JPY_API_TOKEN", "JUPYTER_TOKEN"];

/// Where to reach the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub url: String,
    pub token: Option<String>,
}

/// Ask `jupyter server list --json` for the first running server
pub async fn query_running_servers() -> Option<RunningServer> {
    let output = Command::new("jupyter")
        .args(["server", "list", "--json"])
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(SERVER_LIST_TIMEOUT, output).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!(error = %e, "jupyter server list unavailable");
            return None;
        }
        Err(_) => {
            debug!("jupyter server list timed out");
            return None;
        }
    };

    if !output.status.success() {
        return None;
    }
    parse_server_list(&String::from_utf8_lossy(&output.stdout))
}

/// First server of `jupyter server list --json` output (one object per line)
pub fn parse_server_list(stdout: &str) -> Option<RunningServer> {
    let first = stdout.trim().lines().next()?;
    match serde_json::from_str(first) {
        Ok(server) => Some(server),
        Err(e) => {
            debug!(error = %e, "Unparseable server list entry");
            None
        }
    }
}

/// Pick the server URL and token.
///
/// URL: running-server registry, then `JUPYTERHUB_SERVICE_PREFIX` (port from
/// `JUPYTER_PORT`), then `http://localhost:<JUPYTER_PORT or 8888>`.
/// Token: [`TOKEN_ENV_VARS`] in order, then the registry token.
pub fn resolve_server<F>(registry: Option<RunningServer>, env: F) -> ServerInfo
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| env(key).filter(|v| !v.is_empty());
    let env_token = TOKEN_ENV_VARS.iter().find_map(|key| lookup(*key));

    if let Some(server) = registry {
        let port = server.port.map_or_else(|| DEFAULT_JUPYTER_PORT.to_string(), |p| p.to_string());
        let base_url = server.base_url.as_deref().unwrap_or("/").trim_end_matches('/');
        return ServerInfo {
            url: format!("http://127.0.0.1:{}{}", port, base_url),
            token: env_token.or(server.token.filter(|t| !t.is_empty())),
        };
    }

    let port = lookup("JUPYTER_PORT").unwrap_or_else(|| DEFAULT_JUPYTER_PORT.to_string());

    if let Some(prefix) = lookup("JUPYTERHUB_SERVICE_PREFIX") {
        return ServerInfo {
            url: format!("http://127.0.0.1:{}{}", port, prefix.trim_end_matches('/')),
            token: env_token,
        };
    }

    ServerInfo {
        url: format!("http://localhost:{}", port),
        token: env_token,
    }
}

/// Discover the server using the process environment
pub async fn discover_server() -> ServerInfo {
    let registry = query_running_servers().await;
    resolve_server(registry, |key| std::env::var(key).ok())
}

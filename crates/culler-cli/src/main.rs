//! culler - list and cull idle Jupyter resources from the command line
//!
//! Talks to a running Jupyter server over its REST API. The server is
//! discovered through `jupyter server list` and the usual JupyterHub
//! environment unless `--server-url` is given. Culler status and terminal
//! connections come from the same server, or from a standalone `cullerd`
//! when `--culler-url` is given.

mod cull;
mod list;
#[cfg(test)]
mod test_server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use culler_host_jupyter::{ClientError, JupyterClient, discover_server};
use culler_util::now_utc;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cull::{CullOptions, execute, render_summary};
use crate::list::{build_listing, fetch_snapshot, render_listing};

/// Separator under section headers
pub(crate) const RULE: &str =
    "------------------------------------------------------------";

/// List and cull idle Jupyter kernels, terminals, sessions and workspaces
#[derive(Parser, Debug)]
#[command(name = "culler")]
#[command(about = "List and cull idle Jupyter kernels, terminals, sessions and workspaces")]
#[command(after_help = "Examples:
  culler list                      List all resources and idle times
  culler list --json               List as JSON
  culler cull --dry-run            Show what would be culled
  culler cull                      Cull idle resources
  culler cull --kernel-timeout 30  Cull kernels idle > 30 minutes")]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Jupyter server URL, skips discovery
    #[arg(long, env = "JUPYTER_SERVER_URL")]
    server_url: Option<String>,

    /// Jupyter server token
    #[arg(long)]
    token: Option<String>,

    /// Culler daemon URL for status and terminal connections, defaults to the Jupyter server
    #[arg(long, env = "CULLER_URL")]
    culler_url: Option<String>,

    /// Culler daemon token, defaults to the Jupyter server token
    #[arg(long, env = "CULLER_TOKEN")]
    culler_token: Option<String>,

    /// Log level (logs go to stderr)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all resources and their idle times
    List,

    /// Cull idle resources
    Cull {
        /// Simulate culling without actually terminating
        #[arg(long)]
        dry_run: bool,

        /// Kernel idle timeout in minutes
        #[arg(long, value_name = "MIN", default_value_t = 60)]
        kernel_timeout: u64,

        /// Terminal idle timeout in minutes
        #[arg(long, value_name = "MIN", default_value_t = 60)]
        terminal_timeout: u64,

        /// Session idle timeout in minutes
        #[arg(long, value_name = "MIN", default_value_t = 10080)]
        session_timeout: u64,

        /// Workspace idle timeout in minutes, workspaces are left alone when omitted
        #[arg(long, value_name = "MIN")]
        workspace_timeout: Option<u64>,
    },
}

/// Servers the commands talk to
struct Endpoints {
    jupyter: JupyterClient,
    /// Serves the culler namespace routes
    culler: JupyterClient,
}

async fn connect(cli: &Cli) -> Result<Endpoints> {
    let (url, token) = match &cli.server_url {
        Some(url) => (url.clone(), cli.token.clone()),
        None => {
            let discovered = discover_server().await;
            (discovered.url, cli.token.clone().or(discovered.token))
        }
    };
    debug!(url = %url, authenticated = token.is_some(), "Resolved Jupyter server");
    let jupyter = JupyterClient::new(&url, token.clone())?;

    let culler = match &cli.culler_url {
        Some(culler_url) => {
            let culler_token = cli.culler_token.clone().or(token);
            debug!(
                url = %culler_url,
                authenticated = culler_token.is_some(),
                "Using culler daemon"
            );
            JupyterClient::new(culler_url, culler_token)?
        }
        None => jupyter.clone(),
    };

    Ok(Endpoints { jupyter, culler })
}

async fn cmd_list(endpoints: &Endpoints, json: bool) -> Result<()> {
    let snapshot = fetch_snapshot(&endpoints.jupyter, &endpoints.culler).await?;
    let listing = build_listing(snapshot, now_utc());

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", render_listing(&listing));
    }
    Ok(())
}

async fn cmd_cull(client: JupyterClient, options: CullOptions, json: bool) -> Result<()> {
    let summary = execute(client, &options, now_utc()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let endpoints = connect(&cli).await?;

    match cli.command {
        Command::List => cmd_list(&endpoints, cli.json).await,
        Command::Cull {
            dry_run,
            kernel_timeout,
            terminal_timeout,
            session_timeout,
            workspace_timeout,
        } => {
            let options = CullOptions {
                dry_run,
                kernel_timeout,
                terminal_timeout,
                session_timeout,
                workspace_timeout,
            };
            cmd_cull(endpoints.jupyter, options, cli.json).await
        }
    }
}

/// One-line message for stderr
fn describe_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ClientError>() {
        Some(ClientError::Connect { url, .. }) => {
            format!("Error: Cannot connect to Jupyter server at {}", url)
        }
        _ => format!("Error: {}", error),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe_error(&e));
            ExitCode::from(1)
        }
    }
}

//! cullerd - idle resource culler for a Jupyter server
//!
//! Wires together:
//! - Configuration loading
//! - Jupyter server discovery and REST-backed managers
//! - The culling engine and its timer
//! - The HTTP control plane

use anyhow::{Context, Result};
use clap::Parser;
use culler_api::API_NAMESPACE;
use culler_config::{CullerConfig, load_config};
use culler_core::{CullingEngine, TokioScheduler};
use culler_host_jupyter::{JupyterClient, JupyterHost, ServerInfo, discover_server};
use culler_http::{ControlServer, ControlState, TokenAuth, control_router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// cullerd - shuts down idle kernels, terminals, sessions and workspaces
#[derive(Parser, Debug)]
#[command(name = "cullerd")]
#[command(about = "Idle resource culler for Jupyter servers", long_about = None)]
struct Args {
    /// Configuration file path (or set CULLER_CONFIG env var)
    #[arg(short, long, env = "CULLER_CONFIG")]
    config: Option<PathBuf>,

    /// Control-plane listen address override (or set CULLER_BIND env var)
    #[arg(short, long, env = "CULLER_BIND")]
    bind: Option<SocketAddr>,

    /// Jupyter server URL, discovered when omitted
    #[arg(long)]
    jupyter_url: Option<String>,

    /// Jupyter API token, taken from the environment when omitted
    #[arg(long)]
    jupyter_token: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: Option<Arc<CullingEngine>>,
    server: ControlServer,
    base_url: String,
    auth: TokenAuth,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => {
                let config = load_config(path)
                    .with_context(|| format!("Failed to load config from {:?}", path))?;
                info!(config_path = %path.display(), "Configuration loaded");
                config
            }
            None => {
                info!("No configuration file given, using defaults");
                CullerConfig::default()
            }
        };

        let server = resolve_jupyter(args, &config).await;
        let client = JupyterClient::new(&server.url, server.token)
            .with_context(|| format!("Invalid Jupyter server URL {}", server.url))?;
        info!(
            url = %client.server_url(),
            authenticated = client.has_token(),
            "Using Jupyter server"
        );

        let engine = if config.culling.enabled {
            let host = JupyterHost::new(client);
            let managers = host.managers().await;
            Some(CullingEngine::new(
                managers,
                config.culling.settings.clone(),
                Arc::new(TokioScheduler::new()),
            ))
        } else {
            warn!("Culling disabled in configuration, serving control plane only");
            None
        };

        let bind = args.bind.unwrap_or(config.http.bind);
        let server = ControlServer::bind(bind)
            .await
            .with_context(|| format!("Failed to bind control plane on {}", bind))?;

        Ok(Self {
            engine,
            server,
            base_url: config.http.base_url,
            auth: TokenAuth::new(config.http.token),
        })
    }

    async fn run(self) -> Result<()> {
        let Service {
            engine,
            server,
            base_url,
            auth,
        } = self;

        if let Some(engine) = &engine {
            engine.start();
        }

        let router = control_router(ControlState::new(engine.clone()), &base_url, auth);
        info!(
            addr = %server.local_addr(),
            base_url = %base_url,
            namespace = API_NAMESPACE,
            "Service running"
        );

        let shutdown = shutdown_signal().context("Failed to install signal handlers")?;
        server.serve(router, shutdown).await?;

        info!("Shutting down cullerd");
        if let Some(engine) = &engine {
            engine.stop();
        }

        Ok(())
    }
}

/// Explicit flags, then the config file, then discovery
async fn resolve_jupyter(args: &Args, config: &CullerConfig) -> ServerInfo {
    let url = args.jupyter_url.clone().or_else(|| config.jupyter.url.clone());
    let token = args
        .jupyter_token
        .clone()
        .or_else(|| config.jupyter.token.clone());

    match (url, token) {
        (Some(url), Some(token)) => ServerInfo {
            url,
            token: Some(token),
        },
        (url, token) => {
            let discovered = discover_server().await;
            ServerInfo {
                url: url.unwrap_or(discovered.url),
                token: token.or(discovered.token),
            }
        }
    }
}

/// Resolves on SIGTERM, SIGINT or SIGHUP
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()> + Send + 'static> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            _ = sighup.recv() => info!("Received SIGHUP, shutting down gracefully"),
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "cullerd starting");

    let service = Service::new(&args).await?;
    service.run().await
}

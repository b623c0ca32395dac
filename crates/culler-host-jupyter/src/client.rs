//! REST client for a Jupyter server

use culler_api::{CullerStatus, TerminalConnections, routes};
use culler_host_api::{HostError, KernelInfo, SessionInfo, TerminalInfo, WorkspaceEntry};
use culler_util::{KernelId, SessionId, TerminalName, WorkspaceId};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::WorkspaceListResponse;

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the Jupyter REST client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Cannot connect to Jupyter server at {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{status} for url ({url})")]
    Status { url: String, status: StatusCode },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    pub fn is_connect(&self) -> bool {
        matches!(self, ClientError::Connect { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// `server` names the unreachable server, `url` the failed request
    fn from_reqwest(server: &Url, url: &Url, source: reqwest::Error) -> Self {
        if source.is_connect() {
            ClientError::Connect {
                url: server.as_str().trim_end_matches('/').to_string(),
                source,
            }
        } else {
            ClientError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

impl From<ClientError> for HostError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Status { status, .. } if status == StatusCode::NOT_FOUND => {
                HostError::NotFound(e.to_string())
            }
            ClientError::Connect { .. } => HostError::Unavailable(e.to_string()),
            _ => HostError::Request(e.to_string()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Client for the Jupyter server REST API
#[derive(Debug, Clone)]
pub struct JupyterClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl JupyterClient {
    /// `server_url` includes any base path, e.g. `http://127.0.0.1:8888/user/alice`
    pub fn new(server_url: &str, token: Option<String>) -> ClientResult<Self> {
        let normalized = format!("{}/", server_url.trim_end_matches('/'));
        let base =
            Url::parse(&normalized).map_err(|_| ClientError::InvalidUrl(server_url.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(server_url.to_string()));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Base URL, always ending in `/`
    pub fn server_url(&self) -> &str {
        self.base.as_str()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|_| ClientError::InvalidUrl(format!("{}{}", self.base, path)))
    }

    /// `collection/<id>` with the id escaped as a single path segment
    fn resource_url(&self, collection: &str, id: &str) -> ClientResult<Url> {
        let mut url = self.url(collection)?;
        let invalid = ClientError::InvalidUrl(format!("{}/{}", url, id));
        url.path_segments_mut()
            .map_err(|_| invalid)?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url) -> ClientResult<reqwest::Response> {
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {}", token));
        }

        debug!(%method, %url, "Jupyter request");
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(&self.base, &url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        let response = self.send(Method::GET, url).await?;
        let url = response.url().clone();
        response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(&self.base, &url, e))
    }

    async fn delete(&self, url: Url) -> ClientResult<()> {
        self.send(Method::DELETE, url).await.map(|_| ())
    }

    pub async fn list_kernels(&self) -> ClientResult<Vec<KernelInfo>> {
        self.get_json(self.url("api/kernels")?).await
    }

    /// `Ok(None)` when the server no longer knows the kernel
    pub async fn get_kernel(&self, id: &KernelId) -> ClientResult<Option<KernelInfo>> {
        match self.get_json(self.resource_url("api/kernels", id.as_str())?).await {
            Ok(kernel) => Ok(Some(kernel)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn shutdown_kernel(&self, id: &KernelId) -> ClientResult<()> {
        self.delete(self.resource_url("api/kernels", id.as_str())?).await
    }

    pub async fn list_terminals(&self) -> ClientResult<Vec<TerminalInfo>> {
        self.get_json(self.url("api/terminals")?).await
    }

    pub async fn terminate_terminal(&self, name: &TerminalName) -> ClientResult<()> {
        self.delete(self.resource_url("api/terminals", name.as_str())?).await
    }

    pub async fn list_sessions(&self) -> ClientResult<Vec<SessionInfo>> {
        self.get_json(self.url("api/sessions")?).await
    }

    pub async fn delete_session(&self, id: &SessionId) -> ClientResult<()> {
        self.delete(self.resource_url("api/sessions", id.as_str())?).await
    }

    pub async fn list_workspaces(&self) -> ClientResult<Vec<WorkspaceEntry>> {
        let response: WorkspaceListResponse =
            self.get_json(self.url("lab/api/workspaces")?).await?;
        Ok(response.workspaces.values)
    }

    pub async fn delete_workspace(&self, id: &WorkspaceId) -> ClientResult<()> {
        self.delete(self.resource_url("lab/api/workspaces", id.as_str())?).await
    }

    /// Status of the culler extension running inside the server
    pub async fn culler_status(&self) -> ClientResult<CullerStatus> {
        self.get_json(self.url(&culler_path(routes::STATUS))?).await
    }

    pub async fn terminals_connection(&self) -> ClientResult<TerminalConnections> {
        self.get_json(self.url(&culler_path(routes::TERMINALS_CONNECTION))?).await
    }
}

fn culler_path(route: &str) -> String {
    format!("{}/{}", culler_api::API_NAMESPACE, route)
}

//! Control-plane routes
//!
//! Every handler delegates to the culling engine. The engine is optional:
//! with culling disabled the router still answers, returning empty
//! listings and 503 where a mutation or status needs the engine.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use culler_api::{
    ActiveTerminalsRequest, CullResult, CullerStatus, ErrorBody, SettingsUpdate, StatusOk,
    TerminalConnections, WorkspaceView, namespaced_path, routes,
};
use culler_core::CullingEngine;
use culler_util::CullerError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{TokenAuth, require_token};

/// Shared handler state
#[derive(Clone, Default)]
pub struct ControlState {
    engine: Option<Arc<CullingEngine>>,
}

impl ControlState {
    pub fn new(engine: Option<Arc<CullingEngine>>) -> Self {
        Self { engine }
    }

    fn engine(&self) -> Result<&Arc<CullingEngine>, ControlError> {
        self.engine.as_ref().ok_or(ControlError::NotInitialized)
    }
}

/// Handler failures and their HTTP mapping
#[derive(Debug)]
pub enum ControlError {
    /// Body is not JSON (400)
    InvalidJson,
    /// Body is JSON but a field is wrong (400)
    BadRequest(String),
    /// Culling is disabled (503)
    NotInitialized,
    /// Anything else (500)
    Internal(String),
}

impl From<CullerError> for ControlError {
    fn from(e: CullerError) -> Self {
        match e {
            CullerError::InvalidSettings(_) => ControlError::BadRequest(e.to_string()),
            other => ControlError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ControlError::InvalidJson => (StatusCode::BAD_REQUEST, ErrorBody::invalid_json()),
            ControlError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            ControlError::NotInitialized => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorBody::not_initialized())
            }
            ControlError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(msg))
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Build the control-plane router mounted below `base_url`
pub fn control_router(state: ControlState, base_url: &str, auth: TokenAuth) -> Router {
    let path = |route: &str| namespaced_path(base_url, route);

    Router::new()
        .route(&path(routes::SETTINGS), post(update_settings))
        .route(&path(routes::STATUS), get(status))
        .route(&path(routes::CULL_RESULT), get(cull_result))
        .route(&path(routes::TERMINALS_CONNECTION), get(terminals_connection))
        .route(&path(routes::ACTIVE_TERMINALS), post(active_terminals))
        .route(&path(routes::WORKSPACES), get(workspaces))
        .with_state(state)
        .layer(middleware::from_fn_with_state(auth, require_token))
}

fn parse_body(body: &Bytes) -> Result<Value, ControlError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejected request body");
        ControlError::InvalidJson
    })
}

async fn update_settings(
    State(state): State<ControlState>,
    body: Bytes,
) -> Result<Json<StatusOk>, ControlError> {
    let value = parse_body(&body)?;
    let engine = state.engine()?;

    let update = SettingsUpdate::from_json(&value)?;
    engine.update_settings(&update).map_err(|e| {
        error!(error = %e, "Failed to update settings");
        ControlError::from(e)
    })?;

    info!(changed = !update.is_empty(), "Settings updated over HTTP");
    Ok(Json(StatusOk::ok()))
}

async fn status(State(state): State<ControlState>) -> Result<Json<CullerStatus>, ControlError> {
    Ok(Json(state.engine()?.get_status()))
}

async fn cull_result(State(state): State<ControlState>) -> Json<CullResult> {
    let result = state
        .engine
        .as_ref()
        .map(|engine| engine.get_last_cull_result())
        .unwrap_or_default();
    Json(result)
}

async fn terminals_connection(State(state): State<ControlState>) -> Json<TerminalConnections> {
    match state.engine.as_ref() {
        Some(engine) => Json(engine.get_terminals_connection_status().await),
        None => Json(TerminalConnections::new()),
    }
}

async fn active_terminals(
    State(state): State<ControlState>,
    body: Bytes,
) -> Result<Json<StatusOk>, ControlError> {
    let value = parse_body(&body)?;
    let engine = state.engine()?;

    let request: ActiveTerminalsRequest = serde_json::from_value(value)
        .map_err(|e| ControlError::BadRequest(format!("Invalid terminals list: {}", e)))?;
    engine.set_active_terminals(request.terminals);
    Ok(Json(StatusOk::ok()))
}

async fn workspaces(State(state): State<ControlState>) -> Json<Vec<WorkspaceView>> {
    match state.engine.as_ref() {
        Some(engine) => Json(engine.list_workspaces().await),
        None => Json(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use culler_api::CullerSettings;
    use culler_core::TokioScheduler;
    use culler_host_api::{
        ExecutionState, KernelInfo, MockHost, TerminalInfo, WorkspaceEntry,
    };
    use serde_json::json;
    use tower::ServiceExt;

    const PREFIX: &str = "/jupyterlab-kernel-terminal-workspace-culler-extension";

    fn engine(host: &MockHost) -> Arc<CullingEngine> {
        CullingEngine::new(
            host.managers(),
            CullerSettings::default(),
            Arc::new(TokioScheduler::new()),
        )
    }

    fn app(engine: Option<Arc<CullingEngine>>) -> Router {
        control_router(ControlState::new(engine), "/", TokenAuth::disabled())
    }

    fn get_request(route: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("{}/{}", PREFIX, route))
            .body(Body::empty())
            .unwrap()
    }

    fn post_request(route: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("{}/{}", PREFIX, route))
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_status_reports_settings() {
        let host = MockHost::new();
        let app = app(Some(engine(&host)));

        let (status, body) = send(&app, get_request("status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["running"], json!(false));
        assert_eq!(body["settings"]["kernelCullIdleTimeout"], json!(60));
        assert_eq!(body["settings"]["cullCheckInterval"], json!(5));
    }

    #[tokio::test]
    async fn test_settings_update_applies() {
        let host = MockHost::new();
        let engine = engine(&host);
        let app = app(Some(engine.clone()));

        let (status, body) = send(
            &app,
            post_request(
                "settings",
                json!({"kernelCullIdleTimeout": 30, "somethingElse": true}).to_string(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
        assert_eq!(engine.get_settings().kernel_cull_idle_timeout, 30);
    }

    #[tokio::test]
    async fn test_settings_invalid_json() {
        let host = MockHost::new();
        let app = app(Some(engine(&host)));

        let (status, body) = send(&app, post_request("settings", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid JSON"}));
    }

    #[tokio::test]
    async fn test_settings_invalid_field_changes_nothing() {
        let host = MockHost::new();
        let engine = engine(&host);
        let app = app(Some(engine.clone()));

        let (status, body) = send(
            &app,
            post_request(
                "settings",
                json!({"kernelCullIdleTimeout": 30, "cullCheckInterval": "often"}).to_string(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("cullCheckInterval"));
        assert_eq!(engine.get_settings(), CullerSettings::default());
    }

    #[tokio::test]
    async fn test_settings_oversized_interval_keeps_timer() {
        let host = MockHost::new();
        let engine = engine(&host);
        engine.start();
        let app = app(Some(engine.clone()));

        let (status, body) = send(
            &app,
            post_request(
                "settings",
                json!({"cullCheckInterval": u64::MAX}).to_string(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at most"));

        assert!(engine.is_running());
        assert_eq!(engine.get_settings().cull_check_interval, 5);
        engine.stop();
    }

    #[tokio::test]
    async fn test_without_engine() {
        let app = app(None);

        let (status, body) = send(&app, get_request("status")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Culler not initialized"}));

        let (status, _) = send(&app, post_request("settings", "{}")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(&app, post_request("active-terminals", "{\"terminals\": []}")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = send(&app, get_request("cull-result")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "kernels_culled": [],
                "terminals_culled": [],
                "sessions_culled": [],
                "workspaces_culled": []
            })
        );

        let (_, body) = send(&app, get_request("terminals-connection")).await;
        assert_eq!(body, json!({}));
        let (_, body) = send(&app, get_request("workspaces")).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_cull_result_delivered_once() {
        let host = MockHost::new();
        let now = Utc::now();
        host.kernels.insert(
            KernelInfo::new("k-idle")
                .with_state(ExecutionState::Idle)
                .with_last_activity(now - Duration::hours(2)),
        );
        let engine = engine(&host);
        let app = app(Some(engine.clone()));

        engine.cull_idle_resources(now).await;

        let (_, body) = send(&app, get_request("cull-result")).await;
        assert_eq!(body["kernels_culled"], json!(["k-idle"]));

        let (_, body) = send(&app, get_request("cull-result")).await;
        assert_eq!(body["kernels_culled"], json!([]));
    }

    #[tokio::test]
    async fn test_active_terminals_drive_connection_status() {
        let host = MockHost::new();
        host.terminals.insert(TerminalInfo::new("1"));
        host.terminals.insert(TerminalInfo::new("2"));
        let app = app(Some(engine(&host)));

        let (status, _) = send(
            &app,
            post_request("active-terminals", json!({"terminals": ["2"]}).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get_request("terminals-connection")).await;
        assert_eq!(body, json!({"1": false, "2": true}));
    }

    #[tokio::test]
    async fn test_active_terminals_rejects_bad_shape() {
        let host = MockHost::new();
        let app = app(Some(engine(&host)));

        let (status, _) = send(
            &app,
            post_request("active-terminals", json!({"terminals": "1"}).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, post_request("active-terminals", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid JSON"}));
    }

    #[tokio::test]
    async fn test_workspaces_listed() {
        let host = MockHost::new();
        host.workspaces
            .insert(WorkspaceEntry::new("lab-1").with_last_modified("2024-01-02T00:00:00+00:00"));
        let app = app(Some(engine(&host)));

        let (_, body) = send(&app, get_request("workspaces")).await;
        assert_eq!(
            body,
            json!([{"id": "lab-1", "last_modified": "2024-01-02T00:00:00+00:00", "created": null}])
        );
    }

    #[tokio::test]
    async fn test_token_required_when_configured() {
        let app = control_router(
            ControlState::new(None),
            "/user/alice/",
            TokenAuth::new(Some("secret".into())),
        );
        let uri = "/user/alice/jupyterlab-kernel-terminal-workspace-culler-extension/cull-result";

        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let request = Request::builder()
            .uri(uri)
            .header("authorization", "token secret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .uri(format!("{}?token=secret", uri))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_encoded_query_token_accepted() {
        let app = control_router(
            ControlState::new(None),
            "/",
            TokenAuth::new(Some("s+cr/t%".into())),
        );

        let request = Request::builder()
            .uri(format!("{}/cull-result?token=s%2Bcr%2Ft%25", PREFIX))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .uri(format!("{}/cull-result?token=s+cr/t%25", PREFIX))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

//! In-process stand-ins for a Jupyter server and the culler daemon

use axum::{Json, Router, http::StatusCode, routing::get};
use culler_api::{API_NAMESPACE, CullerSettings, CullerStatus, routes};
use serde_json::{Value, json};

/// Status each optional Jupyter listing answers with
#[derive(Debug, Clone, Copy)]
pub struct Listings {
    pub terminals: StatusCode,
    pub sessions: StatusCode,
    pub workspaces: StatusCode,
}

impl Default for Listings {
    fn default() -> Self {
        Self {
            terminals: StatusCode::OK,
            sessions: StatusCode::OK,
            workspaces: StatusCode::OK,
        }
    }
}

fn answer(status: StatusCode, body: Value) -> Result<Json<Value>, StatusCode> {
    if status.is_success() {
        Ok(Json(body))
    } else {
        Err(status)
    }
}

fn namespaced(route: &str) -> String {
    format!("/{}/{}", API_NAMESPACE, route)
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Jupyter server with no resources. The culler routes are not mounted.
pub async fn jupyter(listings: Listings) -> String {
    let app = Router::new()
        .route("/api/kernels", get(|| async { Json(json!([])) }))
        .route(
            "/api/terminals",
            get(move || async move { answer(listings.terminals, json!([])) }),
        )
        .route(
            "/api/sessions",
            get(move || async move { answer(listings.sessions, json!([])) }),
        )
        .route(
            "/lab/api/workspaces",
            get(move || async move {
                answer(
                    listings.workspaces,
                    json!({"workspaces": {"ids": [], "values": []}}),
                )
            }),
        );
    serve(app).await
}

/// Culler daemon serving only its status and terminal connections
pub async fn culler_daemon(connections: Value) -> String {
    let status = CullerStatus {
        running: true,
        settings: CullerSettings::default(),
    };
    let app = Router::new()
        .route(
            &namespaced(routes::STATUS),
            get(move || {
                let status = status.clone();
                async move { Json(status) }
            }),
        )
        .route(
            &namespaced(routes::TERMINALS_CONNECTION),
            get(move || {
                let connections = connections.clone();
                async move { Json(connections) }
            }),
        );
    serve(app).await
}

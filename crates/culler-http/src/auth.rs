//! Token authentication
//!
//! Requests carry the server token in one of:
//! 1. `Authorization: token <t>`
//! 2. `Authorization: Bearer <t>`
//! 3. `?token=<t>`
//!
//! With no token configured every request is accepted.

use axum::{
    Json,
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use culler_api::ErrorBody;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Expected token, `None` disables authentication
#[derive(Debug, Clone, Default)]
pub struct TokenAuth {
    token: Option<Arc<str>>,
}

impl TokenAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Whether a presented credential satisfies this policy
    pub fn accepts(&self, presented: Option<&str>) -> bool {
        match (&self.token, presented) {
            (None, _) => true,
            (Some(expected), Some(presented)) => expected.as_ref() == presented,
            (Some(_), None) => false,
        }
    }
}

/// Pull a token out of the request headers or the percent-decoded query string
pub fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let value = value.trim();
        for scheme in ["token ", "Token ", "Bearer ", "bearer "] {
            if let Some(token) = value.strip_prefix(scheme) {
                return Some(token.trim().to_string());
            }
        }
    }

    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove("token")
}

/// Middleware rejecting requests without a valid token with 403
pub async fn require_token(State(auth): State<TokenAuth>, request: Request, next: Next) -> Response {
    if !auth.is_enabled() {
        return next.run(request).await;
    }

    let presented = extract_token(request.headers(), request.uri());
    if auth.accepts(presented.as_deref()) {
        return next.run(request).await;
    }

    debug!(
        path = %request.uri().path(),
        had_token = presented.is_some(),
        "Rejected unauthenticated request"
    );
    (StatusCode::FORBIDDEN, Json(ErrorBody::new("Forbidden"))).into_response()
}

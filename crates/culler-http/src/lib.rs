//! HTTP control plane for the idle culler
//!
//! Provides:
//! - Settings, status and result routes under the extension namespace
//! - Token authentication
//! - A listener wrapper with graceful shutdown

mod auth;
mod control;
mod server;

pub use auth::*;
pub use control::*;
pub use server::*;

use thiserror::Error;

/// HTTP server errors
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    ServerError(String),
}

pub type HttpResult<T> = Result<T, HttpError>;

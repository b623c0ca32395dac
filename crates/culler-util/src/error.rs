//! Error types for the idle culler

use thiserror::Error;

/// Core error type for culler operations
#[derive(Debug, Error)]
pub enum CullerError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CullerError {
    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }

    pub fn timestamp(value: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Timestamp {
            value: value.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CullerError>;

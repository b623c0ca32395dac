//! Configuration validation

use crate::schema::RawConfig;
use culler_api::MAX_CHECK_INTERVAL_MINUTES;
use std::net::SocketAddr;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid URL in {field} '{value}': {message}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("Invalid bind address '{value}': {message}")]
    InvalidBind { value: String, message: String },

    #[error("Invalid base_url '{0}': must start with '/'")]
    InvalidBaseUrl(String),

    #[error("{0} cannot be empty; omit it instead")]
    EmptyToken(&'static str),

    #[error("culler.cull_check_interval must be at least 1 minute")]
    ZeroCheckInterval,

    #[error("culler.cull_check_interval must be at most {max} minutes, got {value}")]
    CheckIntervalTooLong { value: u64, max: u64 },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(url) = &config.jupyter.url
        && let Err(message) = check_http_url(url)
    {
        errors.push(ValidationError::InvalidUrl {
            field: "jupyter.url",
            value: url.clone(),
            message,
        });
    }

    if matches!(config.jupyter.token.as_deref(), Some("")) {
        errors.push(ValidationError::EmptyToken("jupyter.token"));
    }

    if let Some(bind) = &config.http.bind
        && let Err(e) = parse_bind(bind)
    {
        errors.push(e);
    }

    if let Some(base_url) = &config.http.base_url
        && !base_url.starts_with('/')
    {
        errors.push(ValidationError::InvalidBaseUrl(base_url.clone()));
    }

    if matches!(config.http.token.as_deref(), Some("")) {
        errors.push(ValidationError::EmptyToken("http.token"));
    }

    match config.culler.cull_check_interval {
        Some(0) => errors.push(ValidationError::ZeroCheckInterval),
        Some(value) if value > MAX_CHECK_INTERVAL_MINUTES => {
            errors.push(ValidationError::CheckIntervalTooLong {
                value,
                max: MAX_CHECK_INTERVAL_MINUTES,
            });
        }
        _ => {}
    }

    errors
}

/// Parse a listen address such as `127.0.0.1:8889`
pub fn parse_bind(value: &str) -> Result<SocketAddr, ValidationError> {
    value
        .parse::<SocketAddr>()
        .map_err(|e| ValidationError::InvalidBind {
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn check_http_url(value: &str) -> Result<(), String> {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"))
        .ok_or_else(|| "scheme must be http or https".to_string())?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err("missing host".into());
    }
    Ok(())
}

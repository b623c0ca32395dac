//! Validated configuration

use crate::schema::{RawConfig, RawCullerConfig};
use crate::validation::{ValidationError, parse_bind};
use culler_api::CullerSettings;
use std::net::SocketAddr;

/// Default control-plane listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8889";

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone, Default)]
pub struct CullerConfig {
    pub jupyter: JupyterConfig,
    pub http: HttpConfig,
    pub culling: CullingConfig,
}

impl CullerConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Result<Self, ValidationError> {
        let bind = parse_bind(raw.http.bind.as_deref().unwrap_or(DEFAULT_BIND))?;

        Ok(Self {
            jupyter: JupyterConfig {
                url: raw.jupyter.url,
                token: raw.jupyter.token,
            },
            http: HttpConfig {
                bind,
                base_url: raw.http.base_url.unwrap_or_else(|| "/".into()),
                token: raw.http.token,
            },
            culling: CullingConfig::from_raw(raw.culler),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct JupyterConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub bind: SocketAddr,
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8889)),
            base_url: "/".into(),
            token: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CullingConfig {
    /// When false the daemon serves the control plane without an engine
    pub enabled: bool,

    /// Settings the engine starts with
    pub settings: CullerSettings,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: CullerSettings::default(),
        }
    }
}

impl CullingConfig {
    fn from_raw(raw: RawCullerConfig) -> Self {
        let d = CullerSettings::default();
        let settings = CullerSettings {
            kernel_cull_enabled: raw.kernel_cull_enabled.unwrap_or(d.kernel_cull_enabled),
            kernel_cull_idle_timeout: raw
                .kernel_cull_idle_timeout
                .unwrap_or(d.kernel_cull_idle_timeout),
            terminal_cull_enabled: raw.terminal_cull_enabled.unwrap_or(d.terminal_cull_enabled),
            terminal_cull_idle_timeout: raw
                .terminal_cull_idle_timeout
                .unwrap_or(d.terminal_cull_idle_timeout),
            terminal_cull_disconnected_only: raw
                .terminal_cull_disconnected_only
                .unwrap_or(d.terminal_cull_disconnected_only),
            session_cull_enabled: raw.session_cull_enabled.unwrap_or(d.session_cull_enabled),
            session_cull_idle_timeout: raw
                .session_cull_idle_timeout
                .unwrap_or(d.session_cull_idle_timeout),
            workspace_cull_enabled: raw.workspace_cull_enabled.unwrap_or(d.workspace_cull_enabled),
            workspace_cull_idle_timeout: raw
                .workspace_cull_idle_timeout
                .unwrap_or(d.workspace_cull_idle_timeout),
            cull_check_interval: raw.cull_check_interval.unwrap_or(d.cull_check_interval),
        };

        Self {
            enabled: raw.enabled.unwrap_or(true),
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_empty_config() {
        let raw: RawConfig = toml::from_str("config_version = 1").unwrap();
        let parsed = CullerConfig::from_raw(raw).unwrap();
        let default = CullerConfig::default();

        assert_eq!(parsed.http.bind, default.http.bind);
        assert_eq!(parsed.http.base_url, default.http.base_url);
        assert_eq!(parsed.culling.settings, default.culling.settings);
        assert_eq!(parsed.culling.enabled, default.culling.enabled);
    }

    #[test]
    fn disabled_culler_keeps_settings() {
        let raw: RawConfig = toml::from_str(
            r#"
            config_version = 1
            [culler]
            enabled = false
            terminal_cull_disconnected_only = false
            "#,
        )
        .unwrap();
        let config = CullerConfig::from_raw(raw).unwrap();
        assert!(!config.culling.enabled);
        assert!(!config.culling.settings.terminal_cull_disconnected_only);
    }
}

//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Jupyter server the culler operates on
    #[serde(default)]
    pub jupyter: RawJupyterConfig,

    /// Control-plane listener
    #[serde(default)]
    pub http: RawHttpConfig,

    /// Initial culler settings
    #[serde(default)]
    pub culler: RawCullerConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawJupyterConfig {
    /// Server URL including base path. Discovered when absent.
    pub url: Option<String>,

    /// API token. Resolved from the environment when absent.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHttpConfig {
    /// Listen address (default: 127.0.0.1:8889)
    pub bind: Option<String>,

    /// Path prefix for the control-plane routes (default: /)
    pub base_url: Option<String>,

    /// Token required from clients. No authentication when absent.
    pub token: Option<String>,
}

/// Culler settings in snake_case. Absent fields take the defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCullerConfig {
    /// Start the culling engine at all
    pub enabled: Option<bool>,

    pub kernel_cull_enabled: Option<bool>,
    pub kernel_cull_idle_timeout: Option<u64>,
    pub terminal_cull_enabled: Option<bool>,
    pub terminal_cull_idle_timeout: Option<u64>,
    pub terminal_cull_disconnected_only: Option<bool>,
    pub session_cull_enabled: Option<bool>,
    pub session_cull_idle_timeout: Option<u64>,
    pub workspace_cull_enabled: Option<bool>,
    pub workspace_cull_idle_timeout: Option<u64>,
    pub cull_check_interval: Option<u64>,
}

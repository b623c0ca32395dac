//! Culler settings and partial updates

use culler_util::{CullerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_KERNEL_TIMEOUT_MINUTES: u64 = 60;
pub const DEFAULT_TERMINAL_TIMEOUT_MINUTES: u64 = 60;
/// Sessions and workspaces default to seven days
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u64 = 10080;
pub const DEFAULT_WORKSPACE_TIMEOUT_MINUTES: u64 = 10080;
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 5;
/// Longest accepted check interval, one year
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 525_600;

/// Current culler settings. Timeouts and the check interval are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CullerSettings {
    pub kernel_cull_enabled: bool,
    pub kernel_cull_idle_timeout: u64,
    pub terminal_cull_enabled: bool,
    pub terminal_cull_idle_timeout: u64,
    /// Only cull terminals that no client tab reports as open
    pub terminal_cull_disconnected_only: bool,
    pub session_cull_enabled: bool,
    pub session_cull_idle_timeout: u64,
    pub workspace_cull_enabled: bool,
    pub workspace_cull_idle_timeout: u64,
    pub cull_check_interval: u64,
}

impl Default for CullerSettings {
    fn default() -> Self {
        Self {
            kernel_cull_enabled: true,
            kernel_cull_idle_timeout: DEFAULT_KERNEL_TIMEOUT_MINUTES,
            terminal_cull_enabled: true,
            terminal_cull_idle_timeout: DEFAULT_TERMINAL_TIMEOUT_MINUTES,
            terminal_cull_disconnected_only: true,
            session_cull_enabled: false,
            session_cull_idle_timeout: DEFAULT_SESSION_TIMEOUT_MINUTES,
            workspace_cull_enabled: true,
            workspace_cull_idle_timeout: DEFAULT_WORKSPACE_TIMEOUT_MINUTES,
            cull_check_interval: DEFAULT_CHECK_INTERVAL_MINUTES,
        }
    }
}

impl CullerSettings {
    /// Apply the present fields of `update`. Returns true if the check
    /// interval changed value.
    pub fn apply(&mut self, update: &SettingsUpdate) -> bool {
        if let Some(v) = update.kernel_cull_enabled {
            self.kernel_cull_enabled = v;
        }
        if let Some(v) = update.kernel_cull_idle_timeout {
            self.kernel_cull_idle_timeout = v;
        }
        if let Some(v) = update.terminal_cull_enabled {
            self.terminal_cull_enabled = v;
        }
        if let Some(v) = update.terminal_cull_idle_timeout {
            self.terminal_cull_idle_timeout = v;
        }
        if let Some(v) = update.terminal_cull_disconnected_only {
            self.terminal_cull_disconnected_only = v;
        }
        if let Some(v) = update.session_cull_enabled {
            self.session_cull_enabled = v;
        }
        if let Some(v) = update.session_cull_idle_timeout {
            self.session_cull_idle_timeout = v;
        }
        if let Some(v) = update.workspace_cull_enabled {
            self.workspace_cull_enabled = v;
        }
        if let Some(v) = update.workspace_cull_idle_timeout {
            self.workspace_cull_idle_timeout = v;
        }

        match update.cull_check_interval {
            Some(v) if v != self.cull_check_interval => {
                self.cull_check_interval = v;
                true
            }
            _ => false,
        }
    }
}

/// Partial settings update. Absent fields leave the current value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_cull_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_cull_idle_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_cull_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_cull_idle_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_cull_disconnected_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cull_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cull_idle_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_cull_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_cull_idle_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cull_check_interval: Option<u64>,
}

impl SettingsUpdate {
    /// Build an update from a loosely-typed JSON object, validating each
    /// known key on its own. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| CullerError::invalid_settings("expected a JSON object"))?;

        let update = Self {
            kernel_cull_enabled: bool_field(object, "kernelCullEnabled")?,
            kernel_cull_idle_timeout: minutes_field(object, "kernelCullIdleTimeout")?,
            terminal_cull_enabled: bool_field(object, "terminalCullEnabled")?,
            terminal_cull_idle_timeout: minutes_field(object, "terminalCullIdleTimeout")?,
            terminal_cull_disconnected_only: bool_field(object, "terminalCullDisconnectedOnly")?,
            session_cull_enabled: bool_field(object, "sessionCullEnabled")?,
            session_cull_idle_timeout: minutes_field(object, "sessionCullIdleTimeout")?,
            workspace_cull_enabled: bool_field(object, "workspaceCullEnabled")?,
            workspace_cull_idle_timeout: minutes_field(object, "workspaceCullIdleTimeout")?,
            cull_check_interval: minutes_field(object, "cullCheckInterval")?,
        };

        update.validate()?;
        Ok(update)
    }

    /// Cross-field checks that also apply to typed updates
    pub fn validate(&self) -> Result<()> {
        match self.cull_check_interval {
            Some(0) => Err(CullerError::invalid_settings(
                "cullCheckInterval must be at least 1 minute",
            )),
            Some(v) if v > MAX_CHECK_INTERVAL_MINUTES => {
                Err(CullerError::invalid_settings(format!(
                    "cullCheckInterval must be at most {MAX_CHECK_INTERVAL_MINUTES} minutes, got {v}"
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn bool_field(object: &Map<String, Value>, key: &str) -> Result<Option<bool>> {
    match object.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(CullerError::invalid_settings(format!(
            "{key} must be a boolean, got {other}"
        ))),
    }
}

fn minutes_field(object: &Map<String, Value>, key: &str) -> Result<Option<u64>> {
    match object.get(key) {
        None => Ok(None),
        Some(value) => {
            // Front ends send whole minutes, sometimes encoded as floats
            let minutes = value.as_u64().or_else(|| {
                value
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            });
            minutes.map(Some).ok_or_else(|| {
                CullerError::invalid_settings(format!(
                    "{key} must be a non-negative whole number of minutes, got {value}"
                ))
            })
        }
    }
}

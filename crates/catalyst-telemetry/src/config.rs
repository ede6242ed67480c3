//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// `EnvFilter` directive, e.g. `info` or `cs_02_deployments=debug`
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "catalyst-content".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Read `CATALYST_SERVICE_NAME`, `CATALYST_LOG_LEVEL` (falling back to
    /// `RUST_LOG`), `CATALYST_CONSOLE_OUTPUT` and `CATALYST_JSON_LOGS`.
    ///
    /// JSON logs default to on inside Kubernetes or Docker.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let in_container = lookup("KUBERNETES_SERVICE_HOST").is_some()
            || lookup("DOCKER_CONTAINER").is_some();
        let flag = |key: &str, default: bool| match lookup(key) {
            Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            None => default,
        };

        Self {
            service_name: lookup("CATALYST_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("CATALYST_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: flag("CATALYST_CONSOLE_OUTPUT", defaults.console_output),
            json_logs: flag("CATALYST_JSON_LOGS", in_container),
        }
    }
}

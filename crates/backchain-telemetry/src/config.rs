//! Telemetry configuration.

use serde::{Deserialize, Serialize};
use std::env;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, coloured.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
    /// Filter installed, nothing written.
    Off,
}

impl LogFormat {
    /// Parse `pretty`, `json` or `off` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "off" | "none" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Logging configuration shared by the subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,
    /// Subsystem the process runs (`"01"`..`"03"`); `None` for a whole node.
    pub subsystem: Option<String>,
    /// `EnvFilter` directives, e.g. `info,lb_02_backchain_resolution=debug`.
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ledger-backchain".to_string(),
            subsystem: None,
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by `LB_SERVICE_NAME`, `LB_SUBSYSTEM`,
    /// `LB_LOG` (falling back to `RUST_LOG`) and `LB_LOG_FORMAT`.
    /// Unparseable formats keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: env::var("LB_SERVICE_NAME").unwrap_or(defaults.service_name),
            subsystem: env::var("LB_SUBSYSTEM").ok().or(defaults.subsystem),
            log_filter: env::var("LB_LOG")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
            log_format: env::var("LB_LOG_FORMAT")
                .ok()
                .and_then(|value| LogFormat::parse(&value))
                .unwrap_or(defaults.log_format),
        }
    }

    /// Environment configuration for one subsystem process.
    pub fn for_subsystem(subsystem_id: &str, subsystem_name: &str) -> Self {
        Self {
            service_name: format!("lb-{subsystem_id}-{subsystem_name}"),
            subsystem: Some(subsystem_id.to_string()),
            ..Self::from_env()
        }
    }

    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

//! # Backchain Telemetry
//!
//! Logging and metrics for the backchain subsystems.
//!
//! ## Components
//!
//! - **Logging**: `tracing` with a `tracing-subscriber` registry (pretty or
//!   JSON output, `EnvFilter` levels)
//! - **Metrics**: Prometheus counters and histograms on an injected
//!   `BackchainMetrics` handle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use backchain_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let telemetry = init_telemetry(&config)?;
//! let service = BackchainResolutionService::new(store.clone(), store, verifier, resolution_config)
//!     .with_metrics(telemetry.metrics.clone());
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LB_SERVICE_NAME` | `ledger-backchain` | Service name in logs |
//! | `LB_LOG` / `RUST_LOG` | `info` | `EnvFilter` directives |
//! | `LB_LOG_FORMAT` | `pretty` | `pretty`, `json` or `off` |
//! | `LB_SUBSYSTEM` | unset | Subsystem identifier |

mod config;
mod logging;
pub mod metrics;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::init_logging;
pub use metrics::{BackchainMetrics, HistogramTimer};

use prometheus::Registry;
use std::sync::Arc;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Handles produced by `init_telemetry`.
pub struct Telemetry {
    /// Registry the host exposes on its metrics endpoint.
    pub registry: Registry,
    /// Metrics handle to pass into component constructors.
    pub metrics: Arc<BackchainMetrics>,
}

/// Install logging and register metrics on a fresh registry.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    let registry = Registry::new();
    let metrics = BackchainMetrics::register(&registry)?;
    init_logging(config)?;

    Ok(Telemetry { registry, metrics })
}

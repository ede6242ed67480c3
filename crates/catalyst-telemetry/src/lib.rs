//! # Catalyst Telemetry
//!
//! Logging and metrics shared by the deployment engine crates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catalyst_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CATALYST_SERVICE_NAME` | `catalyst-content` | Service name in logs |
//! | `CATALYST_LOG_LEVEL` | `info` | Log level filter |
//! | `CATALYST_JSON_LOGS` | `false` | JSON formatted logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, DEPLOYMENTS_COMMITTED, DEPLOYMENT_DURATION,
    GC_DELETED_HASHES, POINTER_CONTENTION, QUEUE_BEING_EXECUTED, QUEUE_PENDING, QUEUE_REJECTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics, then install the tracing subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

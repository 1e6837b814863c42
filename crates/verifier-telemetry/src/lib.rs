//! # Verifier Telemetry
//!
//! Observability stack for the asset classification verifier.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with pretty or JSON output
//! - **Traces**: optional OpenTelemetry export over OTLP
//! - **Metrics**: Prometheus counters and gauges for engine diagnostics
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verifier_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).await.expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP span export endpoint |
//! | `OTEL_SERVICE_NAME` | `ac-verifier` | Service name in traces |
//! | `AC_LOG_LEVEL` | `info` | Log level filter |
//! | `AC_JSON_LOGS` | `false` | JSON log output |
//! | `AC_NETWORK` | `testnet` | Network label |

#![warn(missing_docs)]

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, BLOCKS_RECEIVED, EVENTS_IGNORED,
    HANDLER_FAILURES, ONBOARD_EVENTS, RESTART_DELAY, STREAM_EXITS, STREAM_RESTARTS, SUBMISSIONS,
    TRACKED_HEIGHT, VERIFY_EVENTS,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The tracer or subscriber could not be installed.
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    /// Metrics could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging, optional span export and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
/// When dropped, it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    let tracing_guard = tracing_setup::init_tracing(&config).await?;

    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}

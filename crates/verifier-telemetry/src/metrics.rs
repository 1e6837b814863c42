//! Prometheus metrics for the verifier engine.
//!
//! All metrics follow the naming convention: `ac_verifier_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., blocks_received_total)
//! - **Gauge**: Value that can go up or down (e.g., tracked_height)
//! - **Histogram**: Distribution of values (e.g., restart_delay_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // STREAM METRICS
    // =========================================================================

    /// Blocks delivered by the block stream
    pub static ref BLOCKS_RECEIVED: Counter = Counter::new(
        "ac_verifier_stream_blocks_received_total",
        "Total number of blocks received from the block stream"
    ).expect("metric creation failed");

    /// Last height tracked by the stream driver
    pub static ref TRACKED_HEIGHT: Gauge = Gauge::new(
        "ac_verifier_stream_tracked_height",
        "Last block height tracked by the stream driver"
    ).expect("metric creation failed");

    /// Stream restarts
    pub static ref STREAM_RESTARTS: Counter = Counter::new(
        "ac_verifier_stream_restarts_total",
        "Total number of block stream restarts"
    ).expect("metric creation failed");

    /// Stream exits by reason
    pub static ref STREAM_EXITS: CounterVec = CounterVec::new(
        Opts::new("ac_verifier_stream_exits_total", "Block stream terminations"),
        &["reason"]  // reason: completed/failed/unrecoverable/cancelled
    ).expect("metric creation failed");

    /// Backoff delay applied before a restart
    pub static ref RESTART_DELAY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ac_verifier_stream_restart_delay_seconds",
            "Backoff delay applied before restarting the block stream"
        ).buckets(exponential_buckets(0.1, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT METRICS
    // =========================================================================

    /// Events dropped before reaching business logic
    pub static ref EVENTS_IGNORED: CounterVec = CounterVec::new(
        Opts::new("ac_verifier_events_ignored_total", "Contract events ignored by reason"),
        &["reason"]
    ).expect("metric creation failed");

    /// Onboard event outcomes
    pub static ref ONBOARD_EVENTS: CounterVec = CounterVec::new(
        Opts::new("ac_verifier_onboard_events_total", "Onboard events handled by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Verify event outcomes
    pub static ref VERIFY_EVENTS: CounterVec = CounterVec::new(
        Opts::new("ac_verifier_verify_events_total", "Verify events handled by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Handler invocations that returned an error or panicked
    pub static ref HANDLER_FAILURES: CounterVec = CounterVec::new(
        Opts::new("ac_verifier_handler_failures_total", "Event handler failures by event kind"),
        &["event_kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // SUBMISSION METRICS
    // =========================================================================

    /// Verification transaction submissions by outcome
    pub static ref SUBMISSIONS: CounterVec = CounterVec::new(
        Opts::new("ac_verifier_submissions_total", "Verification submissions by outcome"),
        &["outcome"]  // outcome: succeeded/failed/threw/resync_failed
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all verifier metrics with the global registry.
///
/// Registering twice is not an error, so tests and embedders may call this
/// freely.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BLOCKS_RECEIVED.clone()),
        Box::new(TRACKED_HEIGHT.clone()),
        Box::new(STREAM_RESTARTS.clone()),
        Box::new(STREAM_EXITS.clone()),
        Box::new(RESTART_DELAY.clone()),
        Box::new(EVENTS_IGNORED.clone()),
        Box::new(ONBOARD_EVENTS.clone()),
        Box::new(VERIFY_EVENTS.clone()),
        Box::new(HANDLER_FAILURES.clone()),
        Box::new(SUBMISSIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

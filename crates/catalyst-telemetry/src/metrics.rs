//! Prometheus metrics for the deployment engine.
//!
//! Names follow `catalyst_<area>_<metric>[_<unit>]`. Deployment latency is
//! timed with `DEPLOYMENT_DURATION.start_timer()`, observed on drop.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ADMISSION QUEUE
    // =========================================================================

    /// Tasks currently holding an execution slot
    pub static ref QUEUE_BEING_EXECUTED: Gauge = Gauge::new(
        "catalyst_queue_being_executed",
        "Number of storage tasks currently executing"
    ).expect("metric creation failed");

    /// Tasks waiting for an execution slot
    pub static ref QUEUE_PENDING: Gauge = Gauge::new(
        "catalyst_queue_pending",
        "Number of storage tasks waiting in the admission queue"
    ).expect("metric creation failed");

    /// Tasks refused or abandoned by the admission queue
    pub static ref QUEUE_REJECTED: CounterVec = CounterVec::new(
        Opts::new("catalyst_queue_rejected_total", "Tasks rejected by the admission queue"),
        &["reason"]  // reason: saturated/timeout
    ).expect("metric creation failed");

    // =========================================================================
    // DEPLOYMENTS
    // =========================================================================

    /// Deployments committed to storage
    pub static ref DEPLOYMENTS_COMMITTED: CounterVec = CounterVec::new(
        Opts::new("catalyst_deployments_committed_total", "Deployments committed to storage"),
        &["entity_type"]
    ).expect("metric creation failed");

    /// Time spent inside the deployment transaction
    pub static ref DEPLOYMENT_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "catalyst_deployment_duration_seconds",
            "Time spent committing a deployment"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Deployments refused because their pointers were already in flight
    pub static ref POINTER_CONTENTION: Counter = Counter::new(
        "catalyst_pointer_contention_total",
        "Deployments rejected because their pointers were being deployed"
    ).expect("metric creation failed");

    // =========================================================================
    // GARBAGE COLLECTION
    // =========================================================================

    /// Content hashes deleted by garbage collection
    pub static ref GC_DELETED_HASHES: Counter = Counter::new(
        "catalyst_gc_deleted_hashes_total",
        "Content hashes deleted by garbage collection"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Registering twice is not an error; already-registered collectors are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(QUEUE_BEING_EXECUTED.clone()),
        Box::new(QUEUE_PENDING.clone()),
        Box::new(QUEUE_REJECTED.clone()),
        Box::new(DEPLOYMENTS_COMMITTED.clone()),
        Box::new(DEPLOYMENT_DURATION.clone()),
        Box::new(POINTER_CONTENTION.clone()),
        Box::new(GC_DELETED_HASHES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
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

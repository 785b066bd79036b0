//! Prometheus metrics for the backchain subsystems.
//!
//! All metrics follow the naming convention: `lb_<subsystem>_<metric>_<unit>`.
//! Metrics live on a `BackchainMetrics` handle registered against a caller
//! supplied `Registry`; components receive the handle in their constructors.

use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

/// Metrics shared by the backchain subsystems.
#[derive(Clone)]
pub struct BackchainMetrics {
    registry: Registry,

    /// Transactions received from peers during resolution
    pub transactions_retrieved: IntCounter,

    /// `Get` requests sent to peers
    pub get_requests_sent: IntCounter,

    /// Resolutions by outcome (resolved / skipped / failed)
    pub resolutions: IntCounterVec,

    /// Resolution wall-clock duration
    pub resolution_duration: Histogram,

    /// Contract verifications by outcome (verified / invalid)
    pub contract_verifications: IntCounterVec,

    /// Redelivery timers by event (armed / fired / cancelled)
    pub redeliveries: IntCounterVec,
}

impl BackchainMetrics {
    /// Create the metrics and register them on `registry`.
    pub fn register(registry: &Registry) -> Result<Arc<Self>, TelemetryError> {
        let metrics = Self::build(registry.clone())?;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.transactions_retrieved.clone()),
            Box::new(metrics.get_requests_sent.clone()),
            Box::new(metrics.resolutions.clone()),
            Box::new(metrics.resolution_duration.clone()),
            Box::new(metrics.contract_verifications.clone()),
            Box::new(metrics.redeliveries.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        }
        Ok(Arc::new(metrics))
    }

    /// Metrics on a private registry, for components built without a host
    /// registry (tests, tools).
    #[must_use]
    pub fn detached() -> Arc<Self> {
        Self::register(&Registry::new()).expect("static metric definitions are valid")
    }

    fn build(registry: Registry) -> Result<Self, TelemetryError> {
        let init = |e: prometheus::Error| TelemetryError::MetricsInit(e.to_string());

        Ok(Self {
            registry,
            transactions_retrieved: IntCounter::new(
                "lb_resolution_transactions_retrieved_total",
                "Transactions received from peers during backchain resolution",
            )
            .map_err(init)?,
            get_requests_sent: IntCounter::new(
                "lb_resolution_get_requests_total",
                "Get requests sent to peers",
            )
            .map_err(init)?,
            resolutions: IntCounterVec::new(
                Opts::new("lb_resolution_runs_total", "Backchain resolutions"),
                &["outcome"],
            )
            .map_err(init)?,
            resolution_duration: Histogram::with_opts(
                HistogramOpts::new(
                    "lb_resolution_duration_seconds",
                    "Time spent resolving and verifying a backchain",
                )
                .buckets(exponential_buckets(0.001, 2.0, 15).map_err(init)?),
            )
            .map_err(init)?,
            contract_verifications: IntCounterVec::new(
                Opts::new(
                    "lb_verification_transactions_total",
                    "Transactions run through contract verification",
                ),
                &["outcome"],
            )
            .map_err(init)?,
            redeliveries: IntCounterVec::new(
                Opts::new("lb_redelivery_timers_total", "Redelivery timer events"),
                &["event"],
            )
            .map_err(init)?,
        })
    }

    /// Encode all metrics of the owning registry as Prometheus text format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

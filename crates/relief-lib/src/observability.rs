//! Observability for assessment and allocation
//!
//! Provides:
//! - Prometheus metrics (allocation and inference latency, unmet units, model version)
//! - Structured logging with tracing

use crate::allocation::AllocationResult;
use crate::models::{ResourceKind, SeverityLabel};
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0,
];

static GLOBAL_METRICS: OnceLock<ReliefMetricsInner> = OnceLock::new();

struct ReliefMetricsInner {
    registry: Registry,
    allocation_latency_seconds: Histogram,
    allocation_passes: IntCounter,
    disasters_allocated: IntCounter,
    unmet_units: IntCounterVec,
    inference_latency_seconds: Histogram,
    predictions: IntCounterVec,
    rule_fallbacks: IntCounter,
    model_version_info: GaugeVec,
}

impl ReliefMetricsInner {
    fn new() -> Self {
        let registry = Registry::new();

        let allocation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "relief_allocation_latency_seconds",
                "Time spent computing one allocation pass",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )
        .expect("Failed to create allocation_latency_seconds");

        let allocation_passes = IntCounter::new(
            "relief_allocation_passes_total",
            "Total number of allocation passes",
        )
        .expect("Failed to create allocation_passes");

        let disasters_allocated = IntCounter::new(
            "relief_disasters_allocated_total",
            "Total number of disasters processed by allocation passes",
        )
        .expect("Failed to create disasters_allocated");

        let unmet_units = IntCounterVec::new(
            Opts::new("relief_unmet_units_total", "Units of need left unmet, per resource"),
            &["resource"],
        )
        .expect("Failed to create unmet_units");

        let inference_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "relief_inference_latency_seconds",
                "Time spent encoding and classifying one record",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )
        .expect("Failed to create inference_latency_seconds");

        let predictions = IntCounterVec::new(
            Opts::new("relief_predictions_total", "Severity predictions by label and source"),
            &["severity", "source"],
        )
        .expect("Failed to create predictions");

        let rule_fallbacks = IntCounter::new(
            "relief_rule_fallbacks_total",
            "Assessments that fell back to the rule-based labeler",
        )
        .expect("Failed to create rule_fallbacks");

        let model_version_info = GaugeVec::new(
            Opts::new("relief_model_version_info", "Currently loaded severity model"),
            &["version", "backend"],
        )
        .expect("Failed to create model_version_info");

        registry
            .register(Box::new(allocation_latency_seconds.clone()))
            .expect("Failed to register allocation_latency_seconds");
        registry
            .register(Box::new(allocation_passes.clone()))
            .expect("Failed to register allocation_passes");
        registry
            .register(Box::new(disasters_allocated.clone()))
            .expect("Failed to register disasters_allocated");
        registry
            .register(Box::new(unmet_units.clone()))
            .expect("Failed to register unmet_units");
        registry
            .register(Box::new(inference_latency_seconds.clone()))
            .expect("Failed to register inference_latency_seconds");
        registry
            .register(Box::new(predictions.clone()))
            .expect("Failed to register predictions");
        registry
            .register(Box::new(rule_fallbacks.clone()))
            .expect("Failed to register rule_fallbacks");
        registry
            .register(Box::new(model_version_info.clone()))
            .expect("Failed to register model_version_info");

        Self {
            registry,
            allocation_latency_seconds,
            allocation_passes,
            disasters_allocated,
            unmet_units,
            inference_latency_seconds,
            predictions,
            rule_fallbacks,
            model_version_info,
        }
    }
}

/// Handle to the process-wide metrics. Clones share the same metrics.
#[derive(Clone)]
pub struct ReliefMetrics {
    inner: &'static ReliefMetricsInner,
}

impl Default for ReliefMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReliefMetrics {
    pub fn new() -> Self {
        Self {
            inner: GLOBAL_METRICS.get_or_init(ReliefMetricsInner::new),
        }
    }

    /// Record one completed allocation pass
    pub fn observe_allocation(&self, result: &AllocationResult, duration_secs: f64) {
        self.inner.allocation_latency_seconds.observe(duration_secs);
        self.inner.allocation_passes.inc();
        self.inner
            .disasters_allocated
            .inc_by(result.summary.total_disasters as u64);
        for record in &result.records {
            for (kind, unmet) in record.unmet.iter() {
                if unmet > 0 {
                    self.inner
                        .unmet_units
                        .with_label_values(&[kind.key()])
                        .inc_by(unmet);
                }
            }
        }
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner.inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, severity: SeverityLabel, source: &str) {
        self.inner
            .predictions
            .with_label_values(&[severity.as_str(), source])
            .inc();
    }

    pub fn inc_rule_fallbacks(&self) {
        self.inner.rule_fallbacks.inc();
    }

    pub fn set_model_version(&self, version: &str, backend: &str) {
        self.inner.model_version_info.reset();
        self.inner
            .model_version_info
            .with_label_values(&[version, backend])
            .set(1.0);
    }

    /// Units left unmet for one resource since process start
    pub fn unmet_units(&self, kind: ResourceKind) -> u64 {
        self.inner.unmet_units.with_label_values(&[kind.key()]).get()
    }

    pub fn allocation_passes(&self) -> u64 {
        self.inner.allocation_passes.get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for relief events
#[derive(Clone)]
pub struct StructuredLogger {
    operator: String,
}

impl StructuredLogger {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
        }
    }

    /// Log a completed allocation pass
    pub fn log_allocation_pass(&self, result: &AllocationResult) {
        let summary = &result.summary;
        let shortfall = summary
            .total_need
            .iter()
            .any(|(kind, need)| need > summary.total_allocated.get(kind));

        if shortfall {
            warn!(
                event = "allocation_pass",
                operator = %self.operator,
                disasters = summary.total_disasters,
                people_affected = summary.total_people_affected,
                total_need = summary.total_need.total(),
                total_allocated = summary.total_allocated.total(),
                "Allocation pass completed with unmet need"
            );
        } else {
            info!(
                event = "allocation_pass",
                operator = %self.operator,
                disasters = summary.total_disasters,
                people_affected = summary.total_people_affected,
                total_need = summary.total_need.total(),
                total_allocated = summary.total_allocated.total(),
                "Allocation pass completed, all needs met"
            );
        }
    }

    /// Log a severity assessment
    pub fn log_assessment(
        &self,
        location: &str,
        severity: SeverityLabel,
        confidence: f64,
        source: &str,
        model_version: &str,
    ) {
        info!(
            event = "severity_assessed",
            operator = %self.operator,
            location = %location,
            severity = %severity,
            confidence = confidence,
            source = %source,
            model_version = %model_version,
            "Assessed disaster severity"
        );
    }

    /// Log a model artifact load
    pub fn log_model_loaded(&self, path: &str, model_version: &str, backend: &str) {
        info!(
            event = "model_loaded",
            operator = %self.operator,
            path = %path,
            model_version = %model_version,
            backend = %backend,
            "Severity model artifact loaded"
        );
    }
}

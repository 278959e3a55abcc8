//! Report job metrics.
//!
//! Instruments come from the global meter provider. Without an exporter
//! installed (see `tickerbot_core::init_metrics`) they are no-ops.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use tickerbot_core::GenerationReport;
use tracing::debug;

/// Counters and histograms for the daily report.
#[derive(Clone)]
pub struct ReportMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Report job runs started
    pub runs: Counter<u64>,
    /// Runs that ended in an error
    pub failures: Counter<u64>,
    /// Runs skipped because another was in flight
    pub skips: Counter<u64>,
    /// Generation attempts, labelled by model and outcome
    pub generation_attempts: Counter<u64>,
    /// Generations that fell back to the fixed text
    pub fallbacks: Counter<u64>,
    /// Chunks delivered
    pub chunks_delivered: Counter<u64>,
    /// Deliveries that stopped early
    pub delivery_failures: Counter<u64>,
    /// Job duration in seconds
    pub duration: Histogram<f64>,
}

impl std::fmt::Debug for ReportMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportMetrics").finish_non_exhaustive()
    }
}

impl ReportMetrics {
    /// Create instruments on the `tickerbot_report` meter.
    pub fn new() -> Self {
        let meter = global::meter("tickerbot_report");
        debug!("Building report metrics instruments");

        let runs = meter
            .u64_counter("report.runs")
            .with_description("Report job runs started")
            .build();
        let failures = meter
            .u64_counter("report.failures")
            .with_description("Report job runs that failed")
            .build();
        let skips = meter
            .u64_counter("report.skips")
            .with_description("Report triggers skipped while a run was in flight")
            .build();
        let generation_attempts = meter
            .u64_counter("report.generation.attempts")
            .with_description("Generation attempts by model and outcome")
            .build();
        let fallbacks = meter
            .u64_counter("report.generation.fallbacks")
            .with_description("Generations that hit the hard deadline")
            .build();
        let chunks_delivered = meter
            .u64_counter("report.delivery.chunks")
            .with_description("Chunks delivered to the chat")
            .build();
        let delivery_failures = meter
            .u64_counter("report.delivery.failures")
            .with_description("Deliveries abandoned after a failed send")
            .build();
        let duration = meter
            .f64_histogram("report.duration")
            .with_unit("seconds")
            .with_description("Report job duration")
            .build();

        Self {
            _meter: meter.clone(),
            runs,
            failures,
            skips,
            generation_attempts,
            fallbacks,
            chunks_delivered,
            delivery_failures,
            duration,
        }
    }

    /// Record every attempt of a generation run and whether it fell back.
    pub fn record_generation(&self, report: &GenerationReport) {
        for attempt in report.attempts() {
            let labels = [
                KeyValue::new("model", attempt.model_used().clone()),
                KeyValue::new("outcome", attempt.outcome().label()),
            ];
            self.generation_attempts.add(1, &labels);
        }
        if report.is_fallback() {
            self.fallbacks.add(1, &[]);
        }
    }

    /// Record a delivery.
    pub fn record_delivery(&self, sent: usize, complete: bool) {
        self.chunks_delivered
            .add(u64::try_from(sent).unwrap_or(u64::MAX), &[]);
        if !complete {
            self.delivery_failures.add(1, &[]);
        }
    }

    /// Record a finished run.
    pub fn record_run(&self, duration_secs: f64, failed: bool) {
        let labels = [KeyValue::new("status", if failed { "failed" } else { "ok" })];
        self.runs.add(1, &labels);
        self.duration.record(duration_secs, &labels);
        if failed {
            self.failures.add(1, &[]);
        }
    }

    /// Record a skipped trigger.
    pub fn record_skip(&self) {
        self.skips.add(1, &[]);
    }
}

impl Default for ReportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

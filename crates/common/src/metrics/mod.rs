//! Metrics and observability utilities
//!
//! Prometheus-style metrics with a shared prefix. Recording is a no-op until a
//! recorder (the gateway's Prometheus exporter) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Acadex metrics
pub const METRICS_PREFIX: &str = "acadex";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_attendance_marked_total", METRICS_PREFIX),
        Unit::Count,
        "Attendance mark requests by outcome (marked / updated)"
    );

    describe_counter!(
        format!("{}_import_rows_total", METRICS_PREFIX),
        Unit::Count,
        "Rows written by blueprint imports, by entity"
    );

    describe_histogram!(
        format!("{}_import_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Blueprint import wall time in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Count one attendance mark
pub fn record_attendance_mark(outcome: &str) {
    counter!(
        format!("{}_attendance_marked_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Count rows written by an import for one entity type
pub fn record_import_rows(entity: &str, rows: usize) {
    counter!(
        format!("{}_import_rows_total", METRICS_PREFIX),
        "entity" => entity.to_string()
    )
    .increment(rows as u64);
}

/// Record a finished import
pub fn record_import(duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    histogram!(
        format!("{}_import_duration_seconds", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .record(duration_secs);
}

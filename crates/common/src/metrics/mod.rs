//! Metrics and observability utilities
//!
//! Prometheus metrics with latency histograms and
//! standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::{Duration, Instant};

/// Metrics prefix for all ClauseLens metrics
pub const METRICS_PREFIX: &str = "clauselens";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Buckets for model completions (much slower than plain requests)
pub const AI_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    20.00,  // 20s
    40.00,  // 40s
    90.00,  // 90s
];

/// Histograms exported with explicit buckets; anything else stays a summary
pub fn histogram_buckets() -> Vec<(String, &'static [f64])> {
    vec![
        (format!("{}_request_duration_seconds", METRICS_PREFIX), LATENCY_BUCKETS),
        (format!("{}_analysis_duration_seconds", METRICS_PREFIX), AI_BUCKETS),
        (format!("{}_ai_request_duration_seconds", METRICS_PREFIX), AI_BUCKETS),
    ]
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
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

    // Analysis pipeline
    describe_counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        Unit::Count,
        "Contract analyses by tier and outcome"
    );

    describe_histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end analysis latency in seconds"
    );

    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Uploaded contract documents"
    );

    describe_histogram!(
        format!("{}_upload_bytes", METRICS_PREFIX),
        Unit::Bytes,
        "Size of uploaded documents"
    );

    // Model calls
    describe_counter!(
        format!("{}_ai_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Generative model requests"
    );

    describe_histogram!(
        format!("{}_ai_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generative model latency in seconds, retries included"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
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

/// Record a finished analysis
pub fn record_analysis(duration: Duration, tier: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        "tier" => tier.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_analysis_duration_seconds", METRICS_PREFIX),
            "tier" => tier.to_string()
        )
        .record(duration.as_secs_f64());
    }
}

/// Record one model call (retries included)
pub fn record_ai_request(model: &str, outcome: &str, duration: Duration) {
    counter!(
        format!("{}_ai_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_ai_request_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record an accepted upload
pub fn record_upload(size_bytes: usize) {
    counter!(format!("{}_uploads_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_upload_bytes", METRICS_PREFIX)).record(size_bytes as f64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}

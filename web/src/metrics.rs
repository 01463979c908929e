//! Prometheus metrics for the web server.
//!
//! Tracks prediction throughput, rejected uploads, and inference latency.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramTimer, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Once;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ========== Prediction Metrics ==========

    /// Total successful predictions
    pub static ref PREDICTIONS: IntCounter = IntCounter::with_opts(
        Opts::new("vision_predictions_total", "Total successful predictions")
    ).unwrap();

    /// Rejected or failed uploads by reason
    pub static ref UPLOADS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("vision_uploads_rejected_total", "Uploads rejected or failed, by reason"),
        &["reason"]
    ).unwrap();

    /// GIF uploads re-encoded as PNG
    pub static ref GIF_CONVERSIONS: IntCounter = IntCounter::with_opts(
        Opts::new("vision_gif_conversions_total", "GIF uploads converted to PNG")
    ).unwrap();

    // ========== Latency ==========

    /// HTTP request latency by endpoint and method
    pub static ref REQUEST_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new("vision_request_duration_seconds", "HTTP request latency")
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["endpoint", "method"]
    ).unwrap();

    /// Forward pass latency
    pub static ref INFERENCE_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("vision_inference_seconds", "Time for one forward pass")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0])
    ).unwrap();

    // ========== Model Status ==========

    /// Whether a model is loaded (0/1)
    pub static ref MODEL_LOADED: IntGauge = IntGauge::with_opts(
        Opts::new("vision_model_loaded", "Whether a model is loaded (0/1)")
    ).unwrap();
}

static INIT: Once = Once::new();

/// Initialize and register all metrics with the registry.
/// Safe to call multiple times - only initializes once.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY.register(Box::new(PREDICTIONS.clone())).unwrap();
        REGISTRY
            .register(Box::new(UPLOADS_REJECTED.clone()))
            .unwrap();
        REGISTRY.register(Box::new(GIF_CONVERSIONS.clone())).unwrap();
        REGISTRY
            .register(Box::new(REQUEST_LATENCY.clone()))
            .unwrap();
        REGISTRY
            .register(Box::new(INFERENCE_SECONDS.clone()))
            .unwrap();
        REGISTRY.register(Box::new(MODEL_LOADED.clone())).unwrap();
    });
}

/// Start timing a request; the duration is recorded when the timer drops.
pub fn request_timer(endpoint: &str, method: &str) -> HistogramTimer {
    REQUEST_LATENCY
        .with_label_values(&[endpoint, method])
        .start_timer()
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

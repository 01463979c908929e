//! Health check and metrics endpoints.

use axum::http::{header, StatusCode};

use crate::metrics;

/// Health check handler.
pub async fn health() -> &'static str {
    let _timer = metrics::request_timer("/health", "GET");
    "Hello World!"
}

/// Prometheus metrics handler.
pub async fn metrics_handler() -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let _timer = metrics::request_timer("/metrics", "GET");
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::encode_metrics(),
    )
}

//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

use vrender_media::ArtifactKind;
use vrender_models::PipelineStage;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vrender_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vrender_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vrender_http_requests_in_flight";

    // Render metrics
    pub const RENDERS_TOTAL: &str = "vrender_renders_total";
    pub const RENDERS_IN_FLIGHT: &str = "vrender_renders_in_flight";
    pub const RENDER_DURATION_SECONDS: &str = "vrender_render_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "vrender_upload_duration_seconds";
    pub const CLEANUP_WARNINGS_TOTAL: &str = "vrender_cleanup_warnings_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a successful render.
pub fn record_render_succeeded(duration_secs: f64) {
    let labels = [("outcome", "succeeded".to_string())];
    counter!(names::RENDERS_TOTAL, &labels).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed render and the stage it failed in.
pub fn record_render_failed(stage: PipelineStage, duration_secs: f64) {
    let labels = [
        ("outcome", "failed".to_string()),
        ("stage", stage.as_str().to_string()),
    ];
    counter!(names::RENDERS_TOTAL, &labels).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Track renders currently running.
pub fn adjust_renders_in_flight(delta: f64) {
    gauge!(names::RENDERS_IN_FLIGHT).increment(delta);
}

/// Record upload duration.
pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record an artifact that could not be removed.
pub fn record_cleanup_warning(kind: ArtifactKind) {
    let labels = [("kind", kind.as_str().to_string())];
    counter!(names::CLEANUP_WARNINGS_TOTAL, &labels).increment(1);
}

/// Collapse per-file paths so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    for prefix in ["/videos/", "/public/"] {
        if path.starts_with(prefix) && path.len() > prefix.len() {
            return format!("{}:file", prefix);
        }
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

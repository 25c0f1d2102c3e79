//! Render handler.

use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Instrument};

use vrender_models::{PipelineStage, RenderRequest, RenderResponse};

use crate::error::{ApiError, ApiResult, PipelineError, PipelineFailure};
use crate::handlers::parse_json_body;
use crate::logging::RenderLogger;
use crate::metrics;
use crate::middleware::RequestId;
use crate::state::AppState;

/// Validate, render and publish one video.
///
/// The pipeline runs on its own task. If this handler is dropped (client
/// gone) the task is cancelled and still cleans up after itself.
pub async fn render_video(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> ApiResult<Json<RenderResponse>> {
    let request_id = request_id
        .map(|Extension(id)| id.0)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let logger = RenderLogger::new(request_id);

    let body = parse_json_body(&body)?;
    let parsed = RenderRequest::from_json(&body).inspect_err(|e| {
        warn!(request_id = %logger.request_id(), "Rejected render request: {}", e);
    })?;
    for notice in &parsed.notices {
        logger.log_notice(notice);
    }
    let request = parsed.request;

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let started = Instant::now();

    let task = {
        let pipeline = state.pipeline.clone();
        let request = request.clone();
        let logger = logger.clone();
        let timeout = state.config.render_request_timeout;
        let span = logger.create_span();
        tokio::spawn(
            async move {
                let _in_flight = InFlightRender::start(spawn_watchdog(cancel.clone(), timeout));
                pipeline.run(&request, &logger, cancel).await
            }
            .instrument(span),
        )
    };

    let result = task.await.unwrap_or_else(|e| {
        Err(PipelineError::new(
            PipelineStage::Failed,
            PipelineFailure::Task(e.to_string()),
        ))
    });
    guard.disarm();

    let elapsed = started.elapsed().as_secs_f64();
    match result {
        Ok(outcome) => {
            metrics::record_render_succeeded(elapsed);
            logger
                .clone()
                .with_render_id(&outcome.render_id)
                .log_completion(&outcome.video_url);
            Ok(Json(RenderResponse::new(outcome.video_url, &request)))
        }
        Err(e) => {
            metrics::record_render_failed(e.stage, elapsed);
            logger.log_failure(&e);
            Err(ApiError::pipeline(e, state.config.expose_error_details))
        }
    }
}

/// One render counted in the in-flight gauge.
///
/// Dropping it, on return or panic, stops the watchdog and lowers the gauge.
struct InFlightRender {
    watchdog: JoinHandle<()>,
}

impl InFlightRender {
    fn start(watchdog: JoinHandle<()>) -> Self {
        metrics::adjust_renders_in_flight(1.0);
        Self { watchdog }
    }
}

impl Drop for InFlightRender {
    fn drop(&mut self) {
        self.watchdog.abort();
        metrics::adjust_renders_in_flight(-1.0);
    }
}

/// Cancel `cancel` once `timeout` passes, unless it is cancelled first.
fn spawn_watchdog(cancel: CancellationToken, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                warn!(timeout_secs = timeout.as_secs(), "Render request timed out, cancelling");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

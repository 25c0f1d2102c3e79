//! Structured render logging.
//!
//! Every render request gets one [`RenderLogger`] so that lifecycle events,
//! stage transitions and progress all carry the same `request_id` and
//! `render_id` fields.

use tracing::{debug, error, info, warn, Span};

use vrender_media::{CleanupWarning, RenderProgress};
use vrender_models::{PipelineStage, RenderId, RequestNotice};

use crate::error::PipelineError;

/// Per-request logger for the render pipeline.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    request_id: String,
    render_id: Option<String>,
}

impl RenderLogger {
    /// Create a logger for one HTTP request.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            render_id: None,
        }
    }

    /// Attach the render id once it is known.
    pub fn with_render_id(mut self, render_id: &RenderId) -> Self {
        self.render_id = Some(render_id.to_string());
        self
    }

    fn render_id_field(&self) -> &str {
        self.render_id.as_deref().unwrap_or("-")
    }

    /// Log the start of a render.
    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            render_id = %self.render_id_field(),
            "Render started: {}", message
        );
    }

    /// Log a stage transition.
    pub fn log_stage(&self, stage: PipelineStage) {
        info!(
            request_id = %self.request_id,
            render_id = %self.render_id_field(),
            stage = stage.as_str(),
            "Render stage: {}", stage
        );
    }

    /// Log render progress. Every tenth percent and the final event go out
    /// at `info`, the rest at `debug`.
    pub fn log_progress(&self, progress: RenderProgress) {
        if progress.is_final || progress.percent % 10 == 0 {
            info!(
                request_id = %self.request_id,
                render_id = %self.render_id_field(),
                percent = progress.percent,
                "Rendering progress: {}%", progress.percent
            );
        } else {
            debug!(
                request_id = %self.request_id,
                render_id = %self.render_id_field(),
                percent = progress.percent,
                "Rendering progress: {}%", progress.percent
            );
        }
    }

    /// Log a request normalization notice.
    pub fn log_notice(&self, notice: &RequestNotice) {
        match notice {
            RequestNotice::UnknownTextPosition(raw) => warn!(
                request_id = %self.request_id,
                "Unknown textPosition '{}', using bottom", raw
            ),
            RequestNotice::EnableAudioOverridden { requested, derived } => debug!(
                request_id = %self.request_id,
                requested,
                derived,
                "Ignoring client enableAudio"
            ),
        }
    }

    /// Log an artifact that could not be removed.
    pub fn log_cleanup_warning(&self, warning: &CleanupWarning) {
        warn!(
            request_id = %self.request_id,
            render_id = %self.render_id_field(),
            kind = warning.kind.as_str(),
            "Cleanup warning: {}", warning
        );
    }

    /// Log a failed render.
    pub fn log_failure(&self, err: &PipelineError) {
        error!(
            request_id = %self.request_id,
            render_id = %self.render_id_field(),
            stage = err.stage.as_str(),
            "Render failed: {}", err
        );
    }

    /// Log the completion of a render.
    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            render_id = %self.render_id_field(),
            "Render completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn render_id(&self) -> Option<&str> {
        self.render_id.as_deref()
    }

    /// Create a tracing span for this render.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "render",
            request_id = %self.request_id,
            render_id = %self.render_id_field()
        )
    }
}

//! Render request pipeline.
//!
//! Generate → bundle → resolve → render → publish → clean up, with cleanup
//! also running on every failure path once the project exists.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use vrender_media::{
    generate_project, remove_generated_project, remove_rendered_artifact, CleanupWarning,
    GeneratorConfig, MediaError, RenderOrchestrator,
};
use vrender_models::{PipelineStage, RenderId, RenderRequest};
use vrender_storage::ArtifactPublisher;

use crate::error::PipelineError;
use crate::logging::RenderLogger;
use crate::metrics;

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub render_id: RenderId,
    pub video_url: String,
    pub frames: u64,
}

/// Everything one render needs besides the request itself.
#[derive(Clone)]
pub struct RenderPipeline {
    generator: GeneratorConfig,
    output_dir: PathBuf,
    orchestrator: RenderOrchestrator,
    publisher: Arc<dyn ArtifactPublisher>,
}

impl RenderPipeline {
    pub fn new(
        generator: GeneratorConfig,
        output_dir: impl Into<PathBuf>,
        orchestrator: RenderOrchestrator,
        publisher: Arc<dyn ArtifactPublisher>,
    ) -> Self {
        Self {
            generator,
            output_dir: output_dir.into(),
            orchestrator,
            publisher,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn publisher(&self) -> &Arc<dyn ArtifactPublisher> {
        &self.publisher
    }

    /// Run one validated request to completion.
    ///
    /// Cancelling `cancel` stops the engine and the upload; the project
    /// files are still removed.
    pub async fn run(
        &self,
        request: &RenderRequest,
        logger: &RenderLogger,
        cancel: CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let render_id = RenderId::new();
        let logger = logger.clone().with_render_id(&render_id);
        let output_filename = render_id.output_filename();
        let output_path = self.output_dir.join(&output_filename);

        logger.log_start(&request.title_text);

        logger.log_stage(PipelineStage::Generating);
        let project = generate_project(request, &self.generator, render_id.clone())
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Generating, e))?;

        let mut stage = PipelineStage::Bundling;
        let rendered = {
            let mut on_stage = |next: PipelineStage| {
                stage = next;
                logger.log_stage(next);
            };
            let progress_logger = logger.clone();
            self.orchestrator
                .run(
                    &project,
                    request.duration_in_seconds,
                    output_path.clone(),
                    Box::new(move |p| progress_logger.log_progress(p)),
                    &mut on_stage,
                    &cancel,
                )
                .await
        };

        // The project is only needed up to the render.
        report_cleanup(&logger, remove_generated_project(&project).await);

        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                // A partial render is not an artifact.
                report_cleanup(&logger, remove_rendered_artifact(&output_path).await);
                return Err(PipelineError::new(stage, e));
            }
        };

        logger.log_stage(PipelineStage::Publishing);
        let upload_start = Instant::now();
        let video_url = tokio::select! {
            result = self.publisher.publish(&rendered.path, &output_filename) => {
                result.map_err(|e| PipelineError::new(PipelineStage::Publishing, e))?
            }
            _ = cancel.cancelled() => {
                return Err(PipelineError::new(PipelineStage::Publishing, MediaError::Cancelled));
            }
        };
        metrics::record_upload_duration(upload_start.elapsed().as_secs_f64());

        logger.log_stage(PipelineStage::CleaningUp);
        report_cleanup(&logger, remove_rendered_artifact(&rendered.path).await);

        logger.log_stage(PipelineStage::Succeeded);
        Ok(PipelineOutcome {
            render_id,
            video_url,
            frames: rendered.frames,
        })
    }
}

fn report_cleanup(logger: &RenderLogger, warnings: Vec<CleanupWarning>) {
    for warning in &warnings {
        logger.log_cleanup_warning(warning);
        metrics::record_cleanup_warning(warning.kind);
    }
}

//! Bundle → resolve composition → render, in that order.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vrender_models::{frames_for, PipelineStage};

use crate::cleanup::{ArtifactKind, CleanupWarning};
use crate::engine::{BundleRef, CompositionInfo, RenderEngine, RenderJob, RenderTimeouts, DEFAULT_CODEC};
use crate::error::{MediaError, MediaResult};
use crate::progress::ProgressCallback;
use crate::project::GeneratedProject;

/// Fixed render parameters.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub codec: String,
    pub timeouts: RenderTimeouts,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            codec: DEFAULT_CODEC.to_string(),
            timeouts: RenderTimeouts::default(),
        }
    }
}

/// A finished local render.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub path: PathBuf,
    pub composition: CompositionInfo,
    pub frames: u64,
}

/// Frames to render for `seconds` at `fps`, rounded down.
pub fn frames_to_render(seconds: f64, fps: f64) -> MediaResult<u64> {
    let frames = frames_for(seconds, fps);
    if frames < 1 {
        return Err(MediaError::NoFrames { seconds, fps });
    }
    Ok(frames as u64)
}

/// Pick the composition with id `component_name`.
pub fn find_composition(
    compositions: Vec<CompositionInfo>,
    component_name: &str,
) -> MediaResult<CompositionInfo> {
    let available: Vec<String> = compositions.iter().map(|c| c.id.clone()).collect();
    compositions
        .into_iter()
        .find(|c| c.id == component_name)
        .ok_or_else(|| MediaError::CompositionNotFound {
            id: component_name.to_string(),
            available,
        })
}

/// Drives one project through the render engine.
#[derive(Clone)]
pub struct RenderOrchestrator {
    engine: Arc<dyn RenderEngine>,
    settings: RenderSettings,
}

impl RenderOrchestrator {
    pub fn new(engine: Arc<dyn RenderEngine>, settings: RenderSettings) -> Self {
        Self { engine, settings }
    }

    /// Render `project` to `output_path`.
    ///
    /// `on_stage` is told about every stage before it starts, so the caller
    /// knows where a failure happened. Nothing is retried. The bundle is
    /// released whether or not rendering succeeded.
    pub async fn run(
        &self,
        project: &GeneratedProject,
        duration_in_seconds: f64,
        output_path: PathBuf,
        on_progress: ProgressCallback,
        on_stage: &mut (dyn FnMut(PipelineStage) + Send),
        cancel: &CancellationToken,
    ) -> MediaResult<RenderedArtifact> {
        on_stage(PipelineStage::Bundling);
        let bundle = self.engine.bundle(&project.entry_path, cancel).await?;

        let result = self
            .resolve_and_render(project, duration_in_seconds, &bundle, output_path, on_progress, on_stage, cancel)
            .await;

        if let Err(e) = self.engine.release(&bundle).await {
            let warning = CleanupWarning {
                kind: ArtifactKind::Bundle,
                path: PathBuf::from(&bundle.location),
                reason: e.to_string(),
            };
            warn!(engine = self.engine.name(), "Cleanup warning: {}", warning);
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_and_render(
        &self,
        project: &GeneratedProject,
        duration_in_seconds: f64,
        bundle: &BundleRef,
        output_path: PathBuf,
        on_progress: ProgressCallback,
        on_stage: &mut (dyn FnMut(PipelineStage) + Send),
        cancel: &CancellationToken,
    ) -> MediaResult<RenderedArtifact> {
        on_stage(PipelineStage::ResolvingComposition);
        let compositions = self.engine.list_compositions(bundle, cancel).await?;
        let composition = find_composition(compositions, &project.component_name)?;

        let frames = frames_to_render(duration_in_seconds, composition.fps)?;
        info!(
            composition = %composition.id,
            fps = composition.fps,
            frames,
            "Resolved composition"
        );

        on_stage(PipelineStage::Rendering);
        let job = RenderJob {
            composition: composition.clone(),
            bundle: bundle.clone(),
            codec: self.settings.codec.clone(),
            output_path: output_path.clone(),
            frames,
            timeouts: self.settings.timeouts,
        };
        self.engine.render(&job, on_progress, cancel).await?;

        Ok(RenderedArtifact {
            path: output_path,
            composition,
            frames,
        })
    }
}

//! Application state.

use std::sync::Arc;

use vrender_media::{
    GeneratorConfig, RemotionCli, RemotionConfig, RenderEngine, RenderOrchestrator, RenderSettings,
};
use vrender_storage::{ArtifactPublisher, SupabaseStorage};

use crate::config::ApiConfig;
use crate::services::RenderPipeline;

/// Shared application state.
///
/// Built explicitly from its collaborators so tests can swap in their own
/// engine, publisher and directories.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub pipeline: RenderPipeline,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(
        config: ApiConfig,
        generator: GeneratorConfig,
        engine: Arc<dyn RenderEngine>,
        publisher: Arc<dyn ArtifactPublisher>,
        settings: RenderSettings,
    ) -> Self {
        let orchestrator = RenderOrchestrator::new(engine, settings);
        let pipeline = RenderPipeline::new(generator, config.output_dir.clone(), orchestrator, publisher);
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Production state: Remotion CLI engine and Supabase storage.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let generator = GeneratorConfig::from_env();
        let engine = RemotionCli::new(RemotionConfig::from_env());
        let storage = SupabaseStorage::from_env()?;

        Ok(Self::new(
            config,
            generator,
            Arc::new(engine),
            Arc::new(storage),
            RenderSettings::default(),
        ))
    }
}

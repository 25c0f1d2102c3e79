#![deny(unreachable_patterns)]
//! Remotion project generation and rendering.
//!
//! This crate provides:
//! - Per-request Remotion project generation from a validated request
//! - Type-safe Remotion CLI command building
//! - Progress parsing and monotonic progress reporting
//! - Cancellation and timeouts for every engine call
//! - Best-effort cleanup of generated and rendered artifacts

pub mod cleanup;
pub mod command;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod project;

pub use cleanup::{
    remove_artifact, remove_generated_project, remove_rendered_artifact, ArtifactKind,
    CleanupWarning,
};
pub use command::{ProcessOutput, ProcessRunner, RemotionCommand};
pub use engine::{
    BundleRef, CompositionInfo, RemotionCli, RemotionConfig, RenderEngine, RenderJob,
    RenderTimeouts, DEFAULT_CODEC,
};
pub use error::{MediaError, MediaResult};
pub use orchestrator::{
    find_composition, frames_to_render, RenderOrchestrator, RenderSettings, RenderedArtifact,
};
pub use progress::{ProgressCallback, ProgressTracker, RenderProgress};
pub use project::{
    component_path_for, declared_composition, generate_project, DeclaredComposition,
    GeneratedProject, GeneratorConfig,
};

// Re-export for engine implementors outside this crate.
pub use tokio_util::sync::CancellationToken;

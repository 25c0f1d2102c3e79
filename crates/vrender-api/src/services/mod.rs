//! Business logic services.

pub mod pipeline;

pub use pipeline::{PipelineOutcome, RenderPipeline};

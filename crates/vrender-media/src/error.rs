//! Error types for project generation and rendering.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while generating, bundling or rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Render engine launcher '{0}' not found in PATH")]
    EngineNotFound(String),

    #[error("Remotion {step} failed: {message}")]
    EngineFailed {
        step: &'static str,
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Composition '{id}' not found")]
    CompositionNotFound {
        id: String,
        /// Ids the bundle did expose.
        available: Vec<String>,
    },

    #[error("Duration of {seconds}s at {fps} fps yields no frames to render")]
    NoFrames { seconds: f64, fps: f64 },

    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Project generation failed for {path}: {source}")]
    Generation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an engine failure error.
    pub fn engine_failed(
        step: &'static str,
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EngineFailed {
            step,
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the bundle did not expose the generated composition.
    pub fn is_composition_not_found(&self) -> bool {
        matches!(self, Self::CompositionNotFound { .. })
    }
}

//! API error types.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use vrender_media::MediaError;
use vrender_models::{FailureResponse, PipelineStage, ValidationError, RENDER_FAILURE_MESSAGE};
use vrender_storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Cause of a failed render.
#[derive(Debug, Error)]
pub enum PipelineFailure {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// A render failure together with the stage it happened in.
#[derive(Debug, Error)]
#[error("{failure}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub failure: PipelineFailure,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, failure: impl Into<PipelineFailure>) -> Self {
        Self {
            stage,
            failure: failure.into(),
        }
    }

    /// Stage and cause chain, one cause per line.
    pub fn stack(&self) -> String {
        let mut lines = vec![format!("{} failed at stage {}", self, self.stage)];
        let mut last = self.to_string();
        let mut source = self.failure.source();
        while let Some(err) = source {
            let text = err.to_string();
            if text != last {
                lines.push(format!("caused by: {}", text));
                last = text;
            }
            source = err.source();
        }
        lines.join("\n")
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{error}")]
    Pipeline {
        error: PipelineError,
        /// Whether `error` and `stack` go into the body
        expose_details: bool,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn pipeline(error: PipelineError, expose_details: bool) -> Self {
        Self::Pipeline {
            error,
            expose_details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => {
                let message = match &self {
                    ApiError::BadRequest(msg) => msg.clone(),
                    other => other.to_string(),
                };
                FailureResponse::new(message)
            }
            ApiError::Pipeline {
                error,
                expose_details,
            } => {
                let body = FailureResponse::new(RENDER_FAILURE_MESSAGE);
                if *expose_details {
                    body.with_detail(error.to_string(), error.stack())
                } else {
                    body
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stack_lists_causes_once() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system");
        let err = PipelineError::new(
            PipelineStage::Generating,
            MediaError::Generation {
                path: "/work/x-index.jsx".into(),
                source: io,
            },
        );

        let stack = err.stack();
        let lines: Vec<&str> = stack.lines().collect();
        assert!(lines[0].ends_with("failed at stage generating"));
        assert_eq!(lines[1], "caused by: read-only file system");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_status_codes() {
        let validation = ApiError::from(ValidationError::InvalidSplitPosition {
            received: Some("diagonal".to_string()),
            allowed: "left-right".to_string(),
        });
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let pipeline = ApiError::pipeline(
            PipelineError::new(PipelineStage::Rendering, MediaError::Cancelled),
            true,
        );
        assert_eq!(pipeline.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

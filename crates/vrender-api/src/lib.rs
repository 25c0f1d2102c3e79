//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /render-video`: generate, render and publish one video per request
//! - `POST /test-props`: echo a request body
//! - Static serving of rendered videos and public assets
//! - Health checks and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, PipelineError, PipelineFailure};
pub use logging::RenderLogger;
pub use routes::create_router;
pub use services::{PipelineOutcome, RenderPipeline};
pub use state::AppState;

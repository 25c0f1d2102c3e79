//! Shared data models for the VRender service.
//!
//! This crate provides Serde-serializable types for:
//! - Render requests and their lenient validation
//! - Overlay and split-screen layouts
//! - Request-unique artifact identifiers
//! - The per-request pipeline state machine
//! - HTTP response bodies

pub mod layout;
pub mod render_id;
pub mod request;
pub mod response;
pub mod stage;
pub mod utils;

// Re-export common types
pub use layout::{LayoutParseError, SplitPosition, TextPosition};
pub use render_id::RenderId;
pub use request::{frames_for, ParsedRequest, RenderRequest, RequestNotice, ValidationError};
pub use response::{
    FailureResponse, RenderResponse, TestPropsResponse, UsedValues, RENDER_FAILURE_MESSAGE,
    RENDER_SUCCESS_MESSAGE,
};
pub use stage::PipelineStage;

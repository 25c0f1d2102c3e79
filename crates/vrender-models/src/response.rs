//! HTTP response bodies.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::{SplitPosition, TextPosition};
use crate::request::RenderRequest;

/// Message sent with a successful render.
pub const RENDER_SUCCESS_MESSAGE: &str = "Video rendered and uploaded successfully";

/// Message sent with any pipeline failure.
pub const RENDER_FAILURE_MESSAGE: &str = "Failed to process video";

/// Parameters echoed back after a successful render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsedValues {
    pub title_text: String,
    pub text_position: TextPosition,
    pub split_screen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_position: Option<SplitPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_video_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_demo_video_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_audio_source: Option<String>,
}

impl From<&RenderRequest> for UsedValues {
    fn from(req: &RenderRequest) -> Self {
        Self {
            title_text: req.title_text.clone(),
            text_position: req.text_position,
            split_screen: req.split_screen,
            split_position: req.split_position,
            used_video_source: req.video_source_url.clone(),
            used_demo_video_source: req.demo_video_source_url.clone(),
            used_audio_source: req.audio_source_url.clone(),
        }
    }
}

/// `200` body of `POST /render-video`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub success: bool,
    pub message: String,
    pub video_url: String,
    pub used_values: UsedValues,
}

impl RenderResponse {
    pub fn new(video_url: impl Into<String>, request: &RenderRequest) -> Self {
        Self {
            success: true,
            message: RENDER_SUCCESS_MESSAGE.to_string(),
            video_url: video_url.into(),
            used_values: UsedValues::from(request),
        }
    }
}

/// Failure body shared by every endpoint.
///
/// `error` and `stack` carry internal detail and are only filled for
/// server-side failures when detail exposure is enabled.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl FailureResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: None,
            stack: None,
        }
    }

    pub fn with_detail(mut self, error: impl Into<String>, stack: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.stack = Some(stack.into());
        self
    }
}

/// Body of `POST /test-props`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPropsResponse {
    pub received: Value,
    pub message: String,
}

impl TestPropsResponse {
    pub fn echo(received: Value) -> Self {
        Self {
            received,
            message: "Props received successfully".to_string(),
        }
    }
}

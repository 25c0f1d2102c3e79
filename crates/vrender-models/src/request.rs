//! Render request extraction and validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::layout::{SplitPosition, TextPosition};
use crate::utils::{is_truthy, truthy_number, truthy_string};

/// Title used when the client sends none.
pub const DEFAULT_TITLE: &str = "Default Title";

/// Duration used when the client sends none.
pub const DEFAULT_DURATION_SECS: f64 = 10.0;

/// Audio offset used when the client sends none.
pub const DEFAULT_AUDIO_OFFSET_SECS: f64 = 0.0;

/// A fully-defaulted render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub title_text: String,
    pub duration_in_seconds: f64,
    pub audio_offset_in_seconds: f64,
    pub text_position: TextPosition,
    /// Derived: true iff `audio_source_url` is present.
    pub enable_audio: bool,
    pub split_screen: bool,
    /// Always `Some` when `split_screen` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_position: Option<SplitPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_video_source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_source_url: Option<String>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            title_text: DEFAULT_TITLE.to_string(),
            duration_in_seconds: DEFAULT_DURATION_SECS,
            audio_offset_in_seconds: DEFAULT_AUDIO_OFFSET_SECS,
            text_position: TextPosition::default(),
            enable_audio: false,
            split_screen: false,
            split_position: None,
            video_source_url: None,
            demo_video_source_url: None,
            audio_source_url: None,
        }
    }
}

/// Client-side request fault.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid splitPosition value. Must be one of: {allowed}")]
    InvalidSplitPosition {
        /// What the client sent, if anything.
        received: Option<String>,
        allowed: String,
    },
}

/// Non-fatal observation made while defaulting a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestNotice {
    /// `textPosition` was not recognized and fell back to the default.
    UnknownTextPosition(String),
    /// The client sent `enableAudio`; it is ignored in favor of the derived value.
    EnableAudioOverridden { requested: bool, derived: bool },
}

/// Outcome of [`RenderRequest::from_json`].
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub request: RenderRequest,
    pub notices: Vec<RequestNotice>,
}

impl RenderRequest {
    /// Extract and default a request from a raw JSON body.
    ///
    /// A body that is not an object behaves like `{}`. The only hard check
    /// is that `splitPosition` is one of the four layouts whenever
    /// `splitScreen` is truthy; no other field is bounds- or format-checked.
    pub fn from_json(body: &Value) -> Result<ParsedRequest, ValidationError> {
        let field = |name: &str| body.as_object().and_then(|o| o.get(name));
        let mut notices = Vec::new();

        let split_screen = is_truthy(field("splitScreen"));
        let split_position = if split_screen {
            let raw = field("splitPosition");
            let parsed = raw
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<SplitPosition>().ok());
            match parsed {
                Some(p) => Some(p),
                None => {
                    return Err(ValidationError::InvalidSplitPosition {
                        received: raw.map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        }),
                        allowed: SplitPosition::allowed_values(),
                    })
                }
            }
        } else {
            None
        };

        let text_position = match truthy_string(field("textPosition")) {
            Some(raw) => raw.parse::<TextPosition>().unwrap_or_else(|_| {
                notices.push(RequestNotice::UnknownTextPosition(raw));
                TextPosition::default()
            }),
            None => TextPosition::default(),
        };

        let video_source_url = truthy_string(field("videoSourceUrl"));
        let demo_video_source_url = truthy_string(field("demoVideoSourceUrl"));
        let audio_source_url = truthy_string(field("audioSourceUrl"));
        let enable_audio = audio_source_url.is_some();

        if let Some(requested) = field("enableAudio").and_then(Value::as_bool) {
            if requested != enable_audio {
                notices.push(RequestNotice::EnableAudioOverridden {
                    requested,
                    derived: enable_audio,
                });
            }
        }

        let request = RenderRequest {
            title_text: truthy_string(field("titleText"))
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            duration_in_seconds: truthy_number(field("durationInSeconds"))
                .unwrap_or(DEFAULT_DURATION_SECS),
            audio_offset_in_seconds: truthy_number(field("audioOffsetInSeconds"))
                .unwrap_or(DEFAULT_AUDIO_OFFSET_SECS),
            text_position,
            enable_audio,
            split_screen,
            split_position,
            video_source_url,
            demo_video_source_url,
            audio_source_url,
        };

        Ok(ParsedRequest { request, notices })
    }
}

/// `floor(seconds * fps)`.
pub fn frames_for(seconds: f64, fps: f64) -> i64 {
    (seconds * fps).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<RenderRequest, ValidationError> {
        RenderRequest::from_json(&body).map(|p| p.request)
    }

    #[test]
    fn test_empty_body_uses_defaults() {
        let req = parse(json!({})).unwrap();
        assert_eq!(req, RenderRequest::default());
        assert_eq!(req.title_text, "Default Title");
        assert_eq!(req.duration_in_seconds, 10.0);
        assert_eq!(req.text_position, TextPosition::Bottom);
        assert!(!req.split_screen);
        assert!(!req.enable_audio);
    }

    #[test]
    fn test_non_object_body_uses_defaults() {
        assert_eq!(parse(json!([1, 2, 3])).unwrap(), RenderRequest::default());
        assert_eq!(parse(json!(null)).unwrap(), RenderRequest::default());
    }

    #[test]
    fn test_falsy_values_fall_back_to_defaults() {
        let req = parse(json!({
            "titleText": "",
            "durationInSeconds": 0,
            "audioOffsetInSeconds": null,
            "textPosition": ""
        }))
        .unwrap();
        assert_eq!(req.title_text, DEFAULT_TITLE);
        assert_eq!(req.duration_in_seconds, DEFAULT_DURATION_SECS);
        assert_eq!(req.audio_offset_in_seconds, 0.0);
        assert_eq!(req.text_position, TextPosition::Bottom);
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let req = parse(json!({
            "titleText": "Hello",
            "durationInSeconds": 5,
            "audioOffsetInSeconds": "1.5",
            "textPosition": "top",
            "videoSourceUrl": "https://cdn.example.com/main.mp4"
        }))
        .unwrap();
        assert_eq!(req.title_text, "Hello");
        assert_eq!(req.duration_in_seconds, 5.0);
        assert_eq!(req.audio_offset_in_seconds, 1.5);
        assert_eq!(req.text_position, TextPosition::Top);
        assert_eq!(req.video_source_url.as_deref(), Some("https://cdn.example.com/main.mp4"));
    }

    #[test]
    fn test_duration_is_not_bounds_checked() {
        let req = parse(json!({ "durationInSeconds": -4 })).unwrap();
        assert_eq!(req.duration_in_seconds, -4.0);
    }

    #[test]
    fn test_split_screen_requires_valid_position() {
        for pos in ["left-right", "right-left", "top-bottom", "bottom-top"] {
            let req = parse(json!({ "splitScreen": true, "splitPosition": pos })).unwrap();
            assert_eq!(req.split_position.map(|p| p.as_str()), Some(pos));
        }

        for bad in [json!("diagonal"), json!(""), json!(null), json!(3), json!("LEFT-RIGHT")] {
            let err = parse(json!({ "splitScreen": true, "splitPosition": bad })).unwrap_err();
            assert!(err.to_string().contains("left-right, right-left, top-bottom, bottom-top"));
        }

        let err = parse(json!({ "splitScreen": true })).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidSplitPosition {
                received: None,
                allowed: SplitPosition::allowed_values(),
            }
        );
    }

    #[test]
    fn test_split_screen_truthiness() {
        assert!(parse(json!({ "splitScreen": "yes" })).is_err());
        assert!(parse(json!({ "splitScreen": 1 })).is_err());
        assert!(parse(json!({ "splitScreen": 0, "splitPosition": "nope" })).is_ok());
    }

    #[test]
    fn test_split_position_ignored_without_split_screen() {
        let req = parse(json!({ "splitScreen": false, "splitPosition": "garbage" })).unwrap();
        assert!(!req.split_screen);
        assert_eq!(req.split_position, None);

        let req = parse(json!({ "splitPosition": "garbage" })).unwrap();
        assert_eq!(req.split_position, None);
    }

    #[test]
    fn test_enable_audio_is_derived() {
        let parsed = RenderRequest::from_json(&json!({ "enableAudio": true })).unwrap();
        assert!(!parsed.request.enable_audio);
        assert_eq!(
            parsed.notices,
            vec![RequestNotice::EnableAudioOverridden { requested: true, derived: false }]
        );

        let req = parse(json!({
            "enableAudio": false,
            "audioSourceUrl": "https://cdn.example.com/track.mp3"
        }))
        .unwrap();
        assert!(req.enable_audio);

        let req = parse(json!({ "audioSourceUrl": "" })).unwrap();
        assert!(!req.enable_audio);
        assert_eq!(req.audio_source_url, None);
    }

    #[test]
    fn test_unknown_text_position_falls_back() {
        let parsed = RenderRequest::from_json(&json!({ "textPosition": "sideways" })).unwrap();
        assert_eq!(parsed.request.text_position, TextPosition::Bottom);
        assert_eq!(
            parsed.notices,
            vec![RequestNotice::UnknownTextPosition("sideways".to_string())]
        );
    }

    #[test]
    fn test_frames_rounds_down() {
        assert_eq!(frames_for(5.0, 30.0), 150);
        assert_eq!(frames_for(2.99, 30.0), 89);
        assert_eq!(frames_for(10.0, 29.97), 299);
    }
}

//! Overlay and split-screen layout definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Vertical placement of the title overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    Center,
    /// Default placement
    #[default]
    Bottom,
}

impl TextPosition {
    pub const ALL: &'static [TextPosition] =
        &[TextPosition::Top, TextPosition::Center, TextPosition::Bottom];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextPosition::Top => "top",
            TextPosition::Center => "center",
            TextPosition::Bottom => "bottom",
        }
    }

    /// CSS `justifyContent` value for a full-height flex column.
    pub fn justify_content(&self) -> &'static str {
        match self {
            TextPosition::Top => "flex-start",
            TextPosition::Center => "center",
            TextPosition::Bottom => "flex-end",
        }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextPosition {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(TextPosition::Top),
            "center" | "middle" => Ok(TextPosition::Center),
            "bottom" => Ok(TextPosition::Bottom),
            _ => Err(LayoutParseError::TextPosition(s.to_string())),
        }
    }
}

/// Orientation and order of the two panes in split-screen mode.
///
/// The first half of the name is where the main video goes, the second
/// half is where the demo video goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SplitPosition {
    LeftRight,
    RightLeft,
    TopBottom,
    BottomTop,
}

impl SplitPosition {
    pub const ALL: &'static [SplitPosition] = &[
        SplitPosition::LeftRight,
        SplitPosition::RightLeft,
        SplitPosition::TopBottom,
        SplitPosition::BottomTop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitPosition::LeftRight => "left-right",
            SplitPosition::RightLeft => "right-left",
            SplitPosition::TopBottom => "top-bottom",
            SplitPosition::BottomTop => "bottom-top",
        }
    }

    /// Comma separated list of every accepted value, for error messages.
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the panes sit side by side (as opposed to stacked).
    pub fn is_horizontal(&self) -> bool {
        matches!(self, SplitPosition::LeftRight | SplitPosition::RightLeft)
    }

    /// Whether the main video occupies the first pane (left or top).
    pub fn main_first(&self) -> bool {
        matches!(self, SplitPosition::LeftRight | SplitPosition::TopBottom)
    }
}

impl fmt::Display for SplitPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitPosition {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Exact match only: the accepted set is part of the public contract.
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| LayoutParseError::SplitPosition(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutParseError {
    #[error("Unknown text position: {0}")]
    TextPosition(String),

    #[error("Unknown split position: {0}")]
    SplitPosition(String),
}

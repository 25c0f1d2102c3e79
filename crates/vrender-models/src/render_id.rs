//! Request-unique identifiers for generated artifacts.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier shared by every artifact one request produces.
///
/// Format: `<unix millis>-<12 hex chars>`. The timestamp keeps names
/// sortable; the random part keeps two requests in the same millisecond
/// apart. Only `[0-9a-f-]` is used, so it is safe in file names and
/// composition ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderId(String);

impl RenderId {
    /// Generate a new identifier.
    pub fn new() -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", Utc::now().timestamp_millis(), &random[..12]))
    }

    /// Wrap an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Composition id / component name for the generated project.
    pub fn component_name(&self) -> String {
        format!("DynamicVideo-{}", self.0)
    }

    /// File name of the rendered video.
    pub fn output_filename(&self) -> String {
        format!("video-{}.mp4", self.0)
    }
}

impl Default for RenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_within_a_millisecond() {
        let ids: HashSet<_> = (0..1000).map(|_| RenderId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_derived_names() {
        let id = RenderId::from_string("1700000000000-abcdef012345");
        assert_eq!(id.component_name(), "DynamicVideo-1700000000000-abcdef012345");
        assert_eq!(id.output_filename(), "video-1700000000000-abcdef012345.mp4");
    }

    #[test]
    fn test_charset() {
        let id = RenderId::new();
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c) || c == '-'));
    }
}

//! Per-request pipeline state machine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage a render request is in.
///
/// Linear order: `Validating → Generating → Bundling → ResolvingComposition
/// → Rendering → Publishing → CleaningUp → Succeeded`. Any non-terminal
/// stage may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Validating,
    Generating,
    Bundling,
    ResolvingComposition,
    Rendering,
    Publishing,
    CleaningUp,
    Succeeded,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Validating => "validating",
            PipelineStage::Generating => "generating",
            PipelineStage::Bundling => "bundling",
            PipelineStage::ResolvingComposition => "resolving_composition",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Publishing => "publishing",
            PipelineStage::CleaningUp => "cleaning_up",
            PipelineStage::Succeeded => "succeeded",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Succeeded | PipelineStage::Failed)
    }

    /// Next stage on the success path, `None` once terminal.
    pub fn next(&self) -> Option<PipelineStage> {
        use PipelineStage::*;
        match self {
            Validating => Some(Generating),
            Generating => Some(Bundling),
            Bundling => Some(ResolvingComposition),
            ResolvingComposition => Some(Rendering),
            Rendering => Some(Publishing),
            Publishing => Some(CleaningUp),
            CleaningUp => Some(Succeeded),
            Succeeded | Failed => None,
        }
    }

    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(&self, to: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == PipelineStage::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Best-effort removal of per-request artifacts.
//!
//! Nothing in here returns an error: failures come back as
//! [`CleanupWarning`]s for the caller to log and count.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::project::{component_path_for, GeneratedProject};

/// Which artifact a cleanup step targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    ProjectEntry,
    ProjectComponent,
    Bundle,
    RenderedVideo,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::ProjectEntry => "project_entry",
            ArtifactKind::ProjectComponent => "project_component",
            ArtifactKind::Bundle => "bundle",
            ArtifactKind::RenderedVideo => "rendered_video",
        }
    }
}

/// A deletion that did not happen.
#[derive(Debug, Clone)]
pub struct CleanupWarning {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to remove {} {}: {}",
            self.kind.as_str(),
            self.path.display(),
            self.reason
        )
    }
}

/// Remove one file. A file that is already gone counts as removed.
pub async fn remove_artifact(kind: ArtifactKind, path: &Path) -> Result<(), CleanupWarning> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(kind = kind.as_str(), path = %path.display(), "Removed artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            let warning = CleanupWarning {
                kind,
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
            warn!(kind = kind.as_str(), path = %path.display(), "Cleanup warning: {}", warning);
            Err(warning)
        }
    }
}

/// Remove both files of a generated project.
///
/// The component path is re-derived from the entry path, the same way the
/// generator named it.
pub async fn remove_generated_project(project: &GeneratedProject) -> Vec<CleanupWarning> {
    let mut warnings = Vec::new();

    if let Err(w) = remove_artifact(ArtifactKind::ProjectEntry, &project.entry_path).await {
        warnings.push(w);
    }

    let component = component_path_for(&project.entry_path).unwrap_or_else(|| project.component_path.clone());
    if let Err(w) = remove_artifact(ArtifactKind::ProjectComponent, &component).await {
        warnings.push(w);
    }

    warnings
}

/// Remove the local rendered video. Only call after a successful publish.
pub async fn remove_rendered_artifact(path: &Path) -> Vec<CleanupWarning> {
    match remove_artifact(ArtifactKind::RenderedVideo, path).await {
        Ok(()) => Vec::new(),
        Err(w) => vec![w],
    }
}

//! Publishing seam between the render pipeline and object storage.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Uploads a finished artifact and returns where the public can fetch it.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Upload `local_path` under `filename`, returning its public URL.
    async fn publish(&self, local_path: &Path, filename: &str) -> StorageResult<String>;

    /// Cheap reachability check used by readiness.
    async fn check(&self) -> StorageResult<()> {
        Ok(())
    }
}

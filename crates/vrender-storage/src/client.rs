//! Supabase Storage client implementation.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::publisher::ArtifactPublisher;

/// Content type of every rendered artifact.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Configuration for the Supabase Storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub project_url: String,
    /// S3 API endpoint
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region
    pub region: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let project_url = std::env::var("SUPABASE_URL")
            .map_err(|_| StorageError::config_error("SUPABASE_URL not set"))?;
        let project_url = project_url.trim_end_matches('/').to_string();

        let endpoint_url = std::env::var("SUPABASE_S3_ENDPOINT")
            .unwrap_or_else(|_| default_endpoint(&project_url));

        Ok(Self {
            endpoint_url,
            access_key_id: std::env::var("SUPABASE_S3_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("SUPABASE_S3_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("SUPABASE_S3_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("SUPABASE_S3_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("SUPABASE_BUCKET").unwrap_or_else(|_| "videos".to_string()),
            region: std::env::var("SUPABASE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            project_url,
        })
    }

    /// Public URL of `key` in the configured bucket.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.project_url.trim_end_matches('/'),
            self.bucket_name,
            key
        )
    }
}

fn default_endpoint(project_url: &str) -> String {
    format!("{}/storage/v1/s3", project_url.trim_end_matches('/'))
}

/// Reject keys that would escape the bucket root or be empty.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Supabase Storage client speaking the S3 protocol.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    config: StorageConfig,
}

impl SupabaseStorage {
    /// Create a new client from configuration.
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "supabase",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Public URL of an uploaded object.
    pub fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }

    /// Upload a file.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        validate_key(key)?;
        debug!("Uploading {} to {}/{}", path.display(), self.config.bucket_name, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}/{}", path.display(), self.config.bucket_name, key);
        Ok(())
    }

    /// Check connectivity by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket_name)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("Storage connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactPublisher for SupabaseStorage {
    async fn publish(&self, local_path: &Path, filename: &str) -> StorageResult<String> {
        self.upload_file(local_path, filename, VIDEO_CONTENT_TYPE).await?;
        Ok(self.public_url(filename))
    }

    async fn check(&self) -> StorageResult<()> {
        self.check_connectivity().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StorageConfig {
        StorageConfig {
            project_url: "https://abc.supabase.co/".to_string(),
            endpoint_url: default_endpoint("https://abc.supabase.co/"),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "videos".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            config().public_url("video-1-abc.mp4"),
            "https://abc.supabase.co/storage/v1/object/public/videos/video-1-abc.mp4"
        );
    }

    #[test]
    fn test_default_endpoint() {
        assert_eq!(config().endpoint_url, "https://abc.supabase.co/storage/v1/s3");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("video-1.mp4").is_ok());
        assert!(validate_key("renders/video-1.mp4").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs.mp4").is_err());
        assert!(validate_key("../escape.mp4").is_err());
    }

    #[tokio::test]
    async fn test_publish_missing_file_fails_before_network() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = SupabaseStorage::new(config());

        let err = tokio_test::assert_err!(
            storage
                .publish(&dir.path().join("missing.mp4"), "missing.mp4")
                .await
        );
        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert!(err.to_string().contains("missing.mp4"));
    }

    #[tokio::test]
    async fn test_publish_rejects_bad_key() {
        let storage = SupabaseStorage::new(config());
        let err = tokio_test::assert_err!(storage.publish(Path::new("/tmp/x.mp4"), "../x.mp4").await);
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}

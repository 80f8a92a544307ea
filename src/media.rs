//! Media upload collaborator.
//!
//! Accepts a local file and returns a hosted URL. The production client
//! talks to a Cloudinary-style HTTP API; callers go through
//! `upload_and_discard` so the local temp file is deleted after the
//! attempt regardless of outcome.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::configuration::MediaSettings;
use crate::error::{AppError, MediaError};

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload the file at `local_path` and return its hosted URL.
    async fn upload(&self, local_path: &Path) -> Result<String, AppError>;
}

#[derive(Clone)]
pub struct CloudinaryClient {
    http_client: reqwest::Client,
    base_url: String,
    cloud_name: String,
    upload_preset: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryClient {
    pub fn new(settings: &MediaSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url: settings.base_url.clone(),
            cloud_name: settings.cloud_name.clone(),
            upload_preset: settings.upload_preset.clone(),
        }
    }
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload(&self, local_path: &Path) -> Result<String, AppError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| AppError::Media(MediaError::LocalFile(e.to_string())))?;

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let url = format!("{}/v1_1/{}/auto/upload", self.base_url, self.cloud_name);
        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Media host unreachable: {}", e);
                AppError::Media(MediaError::UploadFailed(e.to_string()))
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::warn!("Media host returned error: {}", e);
                AppError::Media(MediaError::UploadFailed(e.to_string()))
            })?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Media(MediaError::UploadFailed(e.to_string())))?;

        Ok(body.secure_url)
    }
}

/// Upload a spooled file and delete it afterwards, whether or not the
/// upload succeeded.
pub async fn upload_and_discard(
    store: &dyn MediaStore,
    local_path: &Path,
) -> Result<String, AppError> {
    let result = store.upload(local_path).await;

    if let Err(e) = tokio::fs::remove_file(local_path).await {
        tracing::warn!(path = %local_path.display(), "Failed to remove temp file: {}", e);
    }

    result
}

/// Remove spooled files that never reached the upload step.
pub async fn discard(local_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(local_path).await {
        tracing::warn!(path = %local_path.display(), "Failed to remove temp file: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FailingStore;

    #[async_trait]
    impl MediaStore for FailingStore {
        async fn upload(&self, _local_path: &Path) -> Result<String, AppError> {
            Err(AppError::Media(MediaError::UploadFailed(
                "host down".to_string(),
            )))
        }
    }

    struct OkStore;

    #[async_trait]
    impl MediaStore for OkStore {
        async fn upload(&self, _local_path: &Path) -> Result<String, AppError> {
            Ok("https://media.test/uploaded.png".to_string())
        }
    }

    fn spool_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, b"image bytes").expect("failed to write temp file");
        path
    }

    #[tokio::test]
    async fn temp_file_is_deleted_on_success() {
        let path = spool_file("media_ok.png");
        let url = upload_and_discard(&OkStore, &path).await.unwrap();
        assert_eq!(url, "https://media.test/uploaded.png");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn temp_file_is_deleted_on_failure() {
        let path = spool_file("media_fail.png");
        let result = upload_and_discard(&FailingStore, &path).await;
        assert!(result.is_err());
        assert!(!path.exists());
    }
}

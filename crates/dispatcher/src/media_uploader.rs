use std::path::{Path, PathBuf};
use std::sync::Arc;

use bulk_sender_core::{DispatchError, MediaRef, MessagingChannel};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::retry_policy::{RetryError, RetryPolicy};

/// Uploads local media files before a session starts.
pub struct MediaUploader {
    channel: Arc<dyn MessagingChannel>,
    policy: RetryPolicy,
    max_media_bytes: u64,
}

impl MediaUploader {
    pub fn new(channel: Arc<dyn MessagingChannel>, policy: RetryPolicy, max_media_bytes: u64) -> Self {
        Self {
            channel,
            policy,
            max_media_bytes,
        }
    }

    /// Uploads every file in order. The first file that cannot be uploaded
    /// aborts the whole step, so a session never runs with part of its media.
    pub async fn upload_all(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaRef>, DispatchError> {
        let mut uploaded = Vec::with_capacity(paths.len());
        for path in paths {
            uploaded.push(self.upload(path, cancel).await?);
        }
        Ok(uploaded)
    }

    pub async fn upload(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MediaRef, DispatchError> {
        let file_label = path.display().to_string();
        let upload_error = |reason: String| DispatchError::MediaUpload {
            file: file_label.clone(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        if !metadata.is_file() {
            return Err(upload_error("not a regular file".to_string()));
        }
        if metadata.len() > self.max_media_bytes {
            return Err(upload_error(format!(
                "file is {} bytes, limit is {} bytes",
                metadata.len(),
                self.max_media_bytes
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());

        let label = format!("upload {file_name}");
        let result = self
            .policy
            .execute(&label, cancel, |_| {
                self.channel.upload_media(&file_name, bytes.clone())
            })
            .await;

        match result {
            Ok(attempted) => {
                info!(
                    "Uploaded {} as {} after {} attempt(s)",
                    file_label,
                    attempted.value.as_str(),
                    attempted.attempts
                );
                Ok(attempted.value)
            }
            Err(error) => {
                warn!("Upload of {} failed: {}", file_label, error);
                let reason = match (&error, error.last_error()) {
                    (RetryError::Cancelled { .. }, _) => "upload cancelled".to_string(),
                    (_, Some(last)) => last
                        .server_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string()),
                    (_, None) => error.to_string(),
                };
                Err(upload_error(reason))
            }
        }
    }
}

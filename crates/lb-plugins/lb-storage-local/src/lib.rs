//! # lb-storage-local
//! leetboard/crates/lb-plugins/lb-storage-local/src/lib.rs
//! Local filesystem implementation of `AttachmentStore`.
//! Layout: one directory per thread, comment images nested under it.
//!
//! ```text
//! <root>/<post_id>/<filename>
//! <root>/<post_id>/comments/<comment_id>/<filename>
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use lb_core::error::{AppError, AttachmentFault, Result};
use lb_core::traits::AttachmentStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Extensions accepted for upload (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];

pub struct LocalAttachmentStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalAttachmentStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Fails early when the upload root cannot be created.
    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root_path)
            .await
            .map_err(|e| io_err(&self.root_path, e))
    }

    /// Writes `data` at `<root>/<relative>`, refusing to replace an existing file.
    async fn save(&self, relative: &[String], data: &[u8]) -> Result<String> {
        let mut target = self.root_path.clone();
        target.extend(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_err(parent, e))?;
        }

        let opened = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await;
        let mut file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(path = %target.display(), "file already exists");
                return Err(AppError::attachment(
                    AttachmentFault::DuplicateFilename,
                    relative.join("/"),
                ));
            }
            Err(e) => return Err(io_err(&target, e)),
        };
        file.write_all(data).await.map_err(|e| io_err(&target, e))?;
        file.flush().await.map_err(|e| io_err(&target, e))?;

        Ok(format!("{}/{}", self.url_prefix, relative.join("/")))
    }
}

fn io_err(path: &Path, e: std::io::Error) -> AppError {
    error!(path = %path.display(), error = %e, "attachment I/O failed");
    AppError::attachment(AttachmentFault::Io, format!("{}: {e}", path.display()))
}

/// Rejects names that could escape the namespace or are not images.
pub fn validate_filename(filename: &str) -> Result<()> {
    let unsafe_name = filename.is_empty()
        || filename.starts_with('.')
        || filename.contains("..")
        || filename.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(AppError::attachment(AttachmentFault::UnsafeFilename, filename));
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::attachment(
            AttachmentFault::DisallowedExtension,
            format!("{filename}: .{extension} is not an accepted image type"),
        ));
    }
    Ok(())
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn upload_post_image(
        &self,
        post_id: Uuid,
        filename: &str,
        data: Bytes,
    ) -> Result<String> {
        validate_filename(filename).inspect_err(|_| warn!(filename, "rejected post image"))?;

        let url = self.save(&[post_id.to_string(), filename.to_string()], &data).await?;
        info!(post_id = %post_id, url = %url, "post image uploaded");
        Ok(url)
    }

    async fn upload_comment_image(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        filename: &str,
        data: Bytes,
    ) -> Result<String> {
        validate_filename(filename).inspect_err(|_| warn!(filename, "rejected comment image"))?;

        let relative = [
            post_id.to_string(),
            "comments".to_string(),
            comment_id.to_string(),
            filename.to_string(),
        ];
        let url = self.save(&relative, &data).await?;
        info!(post_id = %post_id, comment_id = %comment_id, url = %url, "comment image uploaded");
        Ok(url)
    }
}

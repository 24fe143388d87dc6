// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Avatar uploads stored on the local filesystem and served under `/uploads`.

use crate::error::AppError;
use std::path::{Path, PathBuf};

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Public URL prefix for stored files.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// File extension for an accepted image content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Local file storage rooted at the upload directory.
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and write an avatar. Returns its public path.
    pub async fn save_avatar(
        &self,
        user_id: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds {} bytes",
                MAX_UPLOAD_BYTES
            )));
        }
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        let ext = extension_for(content_type).ok_or_else(|| {
            AppError::BadRequest(format!("Unsupported file type: {}", content_type))
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create upload dir: {}", e)))?;

        let filename = format!("{}-{}.{}", user_id, uuid::Uuid::new_v4(), ext);
        tokio::fs::write(self.root.join(&filename), bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to write upload: {}", e)))?;

        tracing::info!(user_id, filename = %filename, size = bytes.len(), "Avatar stored");
        Ok(format!("{}/{}", PUBLIC_PREFIX, filename))
    }

    /// Remove a previously stored file given its public path. Best-effort.
    pub async fn remove(&self, public_path: &str) {
        let Some(filename) = public_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return;
        };
        // Only plain file names we generated ourselves
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(filename)).await {
            tracing::debug!(error = %e, filename, "Old upload not removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[tokio::test]
    async fn test_save_and_remove_avatar() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let path = store
            .save_avatar("user-1", "image/png", b"\x89PNG fake")
            .await
            .unwrap();
        assert!(path.starts_with("/uploads/user-1-"));
        assert!(path.ends_with(".png"));

        let filename = path.trim_start_matches("/uploads/");
        assert!(dir.path().join(filename).exists());

        store.remove(&path).await;
        assert!(!dir.path().join(filename).exists());
    }

    #[tokio::test]
    async fn test_rejects_bad_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        assert!(matches!(
            store.save_avatar("u", "text/plain", b"hello").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            store.save_avatar("u", "image/png", b"").await,
            Err(AppError::BadRequest(_))
        ));

        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert!(matches!(
            store.save_avatar("u", "image/png", &big).await,
            Err(AppError::PayloadTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_ignores_foreign_paths() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"x").unwrap();

        let store = UploadStore::new(dir.path().join("uploads"));
        store.remove("/uploads/../keep.txt").await;
        store.remove("https://cdn.example/avatar.png").await;
        assert!(outside.exists());
    }
}

/// Disk-based media storage backend
use crate::{
    error::{ApiError, ApiResult},
    media::MediaBackend,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores files on the local filesystem with directory sharding based on
/// key prefixes to prevent too many files in one directory.
#[derive(Clone)]
pub struct DiskMediaBackend {
    base_path: PathBuf,
}

impl DiskMediaBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a key
    ///
    /// Uses directory sharding: {base}/{first2chars}/{key}
    fn media_path(&self, key: &str) -> PathBuf {
        if key.len() >= 2 {
            let shard = &key[0..2];
            self.base_path.join(shard).join(key)
        } else {
            self.base_path.join("_").join(key)
        }
    }

    /// Ensure the directory for a key exists
    async fn ensure_media_dir(&self, key: &str) -> ApiResult<PathBuf> {
        let path = self.media_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ApiError::MediaStorage(format!("Failed to create media directory: {}", e))
            })?;
        }
        Ok(path)
    }
}

#[async_trait]
impl MediaBackend for DiskMediaBackend {
    async fn put(&self, key: &str, data: Vec<u8>) -> ApiResult<()> {
        let path = self.ensure_media_dir(key).await?;

        fs::write(&path, data)
            .await
            .map_err(|e| ApiError::MediaStorage(format!("Failed to write media {}: {}", key, e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> ApiResult<Option<Vec<u8>>> {
        let path = self.media_path(key);

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::MediaStorage(format!(
                "Failed to read media {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> ApiResult<()> {
        let path = self.media_path(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::MediaStorage(format!(
                "Failed to delete media {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> ApiResult<bool> {
        Ok(self.media_path(key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_and_get_media() {
        let dir = tempdir().unwrap();
        let backend = DiskMediaBackend::new(dir.path().to_path_buf());

        let key = "abc123.png";
        let data = b"test media data".to_vec();

        backend.put(key, data.clone()).await.unwrap();

        let retrieved = backend.get(key).await.unwrap();
        assert_eq!(retrieved, Some(data));
    }

    #[tokio::test]
    async fn get_nonexistent_media() {
        let dir = tempdir().unwrap();
        let backend = DiskMediaBackend::new(dir.path().to_path_buf());

        let result = backend.get("nonexistent.png").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn delete_media() {
        let dir = tempdir().unwrap();
        let backend = DiskMediaBackend::new(dir.path().to_path_buf());

        let key = "delete123.png";
        backend.put(key, b"to be deleted".to_vec()).await.unwrap();
        assert!(backend.exists(key).await.unwrap());

        backend.delete(key).await.unwrap();
        assert!(!backend.exists(key).await.unwrap());

        // Deleting again is fine
        backend.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn directory_sharding() {
        let dir = tempdir().unwrap();
        let backend = DiskMediaBackend::new(dir.path().to_path_buf());

        let path = backend.media_path("abc123.png");
        assert!(path.to_string_lossy().contains("/ab/"));
    }
}

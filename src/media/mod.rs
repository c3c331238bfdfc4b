/// Media storage
///
/// Holds avatar and cover images behind a small upload/delete contract.
/// Backends implement [`MediaBackend`]; the disk backend is the default.

pub mod disk;

pub use disk::DiskMediaBackend;

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded file resolved once at the request boundary
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A stored media object and its public URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMedia {
    pub key: String,
    pub url: String,
}

/// Media storage backend trait
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Store a file under a key
    async fn put(&self, key: &str, data: Vec<u8>) -> ApiResult<()>;

    /// Retrieve a file by key
    async fn get(&self, key: &str) -> ApiResult<Option<Vec<u8>>>;

    /// Delete a file by key. Deleting a missing file is not an error.
    async fn delete(&self, key: &str) -> ApiResult<()>;

    /// Check if a file exists
    async fn exists(&self, key: &str) -> ApiResult<bool>;
}

/// Media store: uuid-keyed files addressed by public URL.
///
/// Deletion is by URL: the store strips its own public prefix and removes
/// the keyed file. URLs from other hosts are rejected.
pub struct MediaStore {
    backend: Box<dyn MediaBackend>,
    public_base: String,
}

impl MediaStore {
    /// Create a media store over a backend
    ///
    /// `public_base` is the server's public URL; stored objects are handed
    /// out as `{public_base}/media/{key}`.
    pub fn new(backend: Box<dyn MediaBackend>, public_base: String) -> Self {
        Self {
            backend,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Upload a file and return its stored reference
    pub async fn upload(&self, file: UploadedFile) -> ApiResult<StoredMedia> {
        if file.data.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".to_string()));
        }

        let key = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            extension_for(file.content_type.as_deref(), file.file_name.as_deref())
        );

        self.backend.put(&key, file.data).await?;

        tracing::debug!("stored media object {}", key);

        Ok(StoredMedia {
            url: format!("{}/media/{}", self.public_base, key),
            key,
        })
    }

    /// Delete a stored object by its public URL
    pub async fn delete(&self, url: &str) -> ApiResult<()> {
        let key = self.key_for_url(url).ok_or_else(|| {
            ApiError::MediaStorage(format!("URL not owned by this media store: {}", url))
        })?;

        self.backend.delete(&key).await
    }

    /// Open a stored object for serving: its bytes and content type
    pub async fn open(&self, key: &str) -> ApiResult<Option<(Vec<u8>, String)>> {
        // Reject path-shaped keys before they reach the filesystem
        if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Ok(None);
        }

        let data = self.backend.get(key).await?;
        Ok(data.map(|d| (d, content_type_for(key).to_string())))
    }

    /// Resolve a public URL back to its storage key
    fn key_for_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base)?;
        let key = rest.strip_prefix("/media/")?;
        if key.is_empty() || key.contains('/') {
            return None;
        }
        Some(key.to_string())
    }
}

/// File extension for a stored object, from the declared content type with
/// the original file name as fallback
fn extension_for(content_type: Option<&str>, file_name: Option<&str>) -> &'static str {
    match content_type {
        Some("image/png") => ".png",
        Some("image/jpeg") => ".jpg",
        Some("image/gif") => ".gif",
        Some("image/webp") => ".webp",
        _ => match file_name.and_then(|n| n.rsplit('.').next()) {
            Some("png") => ".png",
            Some("jpg") | Some("jpeg") => ".jpg",
            Some("gif") => ".gif",
            Some("webp") => ".webp",
            _ => ".bin",
        },
    }
}

/// Content type served for a stored key
fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_store(base: &std::path::Path) -> MediaStore {
        MediaStore::new(
            Box::new(DiskMediaBackend::new(base.to_path_buf())),
            "http://localhost:8000".to_string(),
        )
    }

    fn png_file() -> UploadedFile {
        UploadedFile {
            file_name: Some("avatar.png".to_string()),
            content_type: Some("image/png".to_string()),
            data: b"fake png bytes".to_vec(),
        }
    }

    #[tokio::test]
    async fn upload_open_delete_round_trip() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        let stored = store.upload(png_file()).await.unwrap();
        assert!(stored.url.starts_with("http://localhost:8000/media/"));
        assert!(stored.key.ends_with(".png"));

        let (data, content_type) = store.open(&stored.key).await.unwrap().unwrap();
        assert_eq!(data, b"fake png bytes");
        assert_eq!(content_type, "image/png");

        store.delete(&stored.url).await.unwrap();
        assert!(store.open(&stored.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_by_url_and_rejects_foreign_hosts() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        let err = store
            .delete("http://elsewhere.example/media/abc.png")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ApiError::MediaStorage(_)));
    }

    #[tokio::test]
    async fn deleting_missing_object_is_not_an_error() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        store
            .delete("http://localhost:8000/media/gone.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_upload_rejected() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        let err = store
            .upload(UploadedFile {
                file_name: None,
                content_type: None,
                data: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn path_shaped_keys_are_not_served() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        assert!(store.open("../accounts.sqlite").await.unwrap().is_none());
    }

    #[test]
    fn extension_falls_back_to_file_name() {
        assert_eq!(extension_for(Some("image/jpeg"), None), ".jpg");
        assert_eq!(extension_for(None, Some("photo.webp")), ".webp");
        assert_eq!(extension_for(None, None), ".bin");
    }
}

//! Filesystem-backed blob store.
//!
//! Objects live as flat files under a single directory; names are
//! generated by the producer (original stem plus a random suffix), so
//! anything containing a path separator is rejected outright.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{BlobError, BlobStore};

/// Blob store rooted at a local directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a blob store rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Open the store, creating the root directory if needed.
    pub async fn open(root: PathBuf) -> Result<Self, BlobError> {
        fs::create_dir_all(&root).await?;
        Ok(Self::new(root))
    }

    /// Absolute path of an object, after name validation.
    fn object_path(&self, object_name: &str) -> Result<PathBuf, BlobError> {
        if object_name.is_empty()
            || object_name.contains('/')
            || object_name.contains('\\')
            || object_name.contains("..")
        {
            return Err(BlobError::InvalidName(object_name.to_string()));
        }
        Ok(self.root.join(object_name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, object_name: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.object_path(object_name)?;
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn fetch(&self, object_name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.object_path(object_name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(object_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, object_name: &str) -> Result<bool, BlobError> {
        let path = self.object_path(object_name)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn url(&self, object_name: &str) -> Result<String, BlobError> {
        let path = self.object_path(object_name)?;
        if !fs::try_exists(&path).await? {
            return Err(BlobError::NotFound(object_name.to_string()));
        }
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (FsBlobStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp.path().join("blobs")).await.unwrap();
        (store, temp)
    }

    #[tokio::test]
    async fn test_put_fetch_roundtrip() {
        let (store, _temp) = create_test_store().await;

        store.put("call1-abc.wav", b"audio bytes").await.unwrap();

        assert!(store.exists("call1-abc.wav").await.unwrap());
        let bytes = store.fetch("call1-abc.wav").await.unwrap();
        assert_eq!(bytes, b"audio bytes");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let (store, _temp) = create_test_store().await;

        assert!(!store.exists("nope.wav").await.unwrap());
        assert!(matches!(
            store.fetch("nope.wav").await.unwrap_err(),
            BlobError::NotFound(_)
        ));
        assert!(matches!(
            store.url("nope.wav").await.unwrap_err(),
            BlobError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let (store, _temp) = create_test_store().await;

        for name in ["../escape.wav", "a/b.wav", "a\\b.wav", ""] {
            assert!(matches!(
                store.put(name, b"x").await.unwrap_err(),
                BlobError::InvalidName(_)
            ));
        }
    }

    #[tokio::test]
    async fn test_url_points_at_object() {
        let (store, _temp) = create_test_store().await;
        store.put("call1-abc.wav", b"audio").await.unwrap();

        let url = store.url("call1-abc.wav").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("call1-abc.wav"));
    }
}

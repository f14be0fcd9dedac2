//! On-disk asset storage.
//!
//! Blobs live at `clients/{record_id}/{filename}`, keeping each record's
//! uploads in their own folder. Uploading a second file under the same name
//! overwrites the first: the collision policy is last write wins, and the
//! previous content is gone. Metadata about uploads lives on the record
//! itself, not here; a blob whose metadata append failed is simply orphaned.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use atelier_shared::types::RecordId;

use crate::error::ServerError;

#[derive(Debug, Clone)]
pub struct AssetStore {
    base_path: PathBuf,
    max_size: usize,
}

impl AssetStore {
    /// Open the store rooted at `base_path` (created if missing).
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::Internal(format!(
                "Failed to create asset directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Asset store initialized");

        Ok(Self { base_path, max_size })
    }

    /// Store a blob under the record's folder, overwriting any existing
    /// file with the same name.
    pub async fn store(
        &self,
        record: RecordId,
        filename: &str,
        data: &[u8],
    ) -> Result<(), ServerError> {
        if data.is_empty() {
            return Err(ServerError::BadRequest("Empty file".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::AssetTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let path = self.asset_path(record, filename)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ServerError::Internal(format!("Failed to create record folder: {e}"))
            })?;
        }

        fs::write(&path, data).await.map_err(|e| {
            ServerError::Internal(format!("Failed to write asset '{filename}': {e}"))
        })?;

        debug!(record = %record, file = %filename, size = data.len(), "Stored asset");
        Ok(())
    }

    /// Read a blob back.
    pub async fn read(&self, record: RecordId, filename: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.asset_path(record, filename)?;

        if !path.exists() {
            return Err(ServerError::NotFound(format!("Asset '{filename}'")));
        }

        let data = fs::read(&path).await.map_err(|e| {
            ServerError::Internal(format!("Failed to read asset '{filename}': {e}"))
        })?;

        debug!(record = %record, file = %filename, size = data.len(), "Retrieved asset");
        Ok(data)
    }

    /// Resolve `clients/{record_id}/{filename}`, rejecting anything that
    /// could escape the store.
    fn asset_path(&self, record: RecordId, filename: &str) -> Result<PathBuf, ServerError> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(ServerError::BadRequest("Invalid file name".to_string()));
        }

        let target = self
            .base_path
            .join("clients")
            .join(record.to_string())
            .join(filename);
        ensure_within(&self.base_path, &target)
    }
}

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(ServerError::BadRequest(
                    "Path traversal detected".to_string(),
                ));
            }
            _ => {} // RootDir, CurDir, Prefix - skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ServerError::BadRequest(
            "Path traversal detected".to_string(),
        ));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (AssetStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_store_and_read() {
        let (store, _dir) = test_store().await;
        let record = RecordId::new();

        store.store(record, "brief.pdf", b"brief-v1").await.unwrap();
        let data = store.read(record, "brief.pdf").await.unwrap();
        assert_eq!(data, b"brief-v1");
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let (store, _dir) = test_store().await;
        let record = RecordId::new();

        store.store(record, "brief.pdf", b"brief-v1").await.unwrap();
        store.store(record, "brief.pdf", b"brief-v2").await.unwrap();

        // Last write wins: the first upload is unrecoverable.
        let data = store.read(record, "brief.pdf").await.unwrap();
        assert_eq!(data, b"brief-v2");
    }

    #[tokio::test]
    async fn test_records_do_not_share_namespaces() {
        let (store, _dir) = test_store().await;
        let record_a = RecordId::new();
        let record_b = RecordId::new();

        store.store(record_a, "logo.png", b"a").await.unwrap();
        assert!(store.read(record_b, "logo.png").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.store(RecordId::new(), "x.bin", b"").await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path().to_path_buf(), 8).await.unwrap();
        let err = store
            .store(RecordId::new(), "big.bin", b"123456789")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::AssetTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (store, _dir) = test_store().await;
        let record = RecordId::new();

        for name in ["../escape", "a/b", "a\\b", ""] {
            assert!(store.store(record, name, b"data").await.is_err(), "{name}");
        }
    }
}

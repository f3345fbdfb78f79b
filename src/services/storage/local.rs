use super::{ObjectInfo, PhotoStorage, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage: one file per key under `base_path`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Creates the storage, making sure `base_path` exists
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Backend(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Rejects keys that could escape the base directory
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        let invalid = key.is_empty()
            || key.starts_with('/')
            || key.contains('\\')
            || key.contains('\0')
            || key.split('/').any(|segment| segment.is_empty() || segment == "..");

        if invalid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl PhotoStorage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();
        let write_failure = |e: std::io::Error| StorageError::WriteFailure {
            key: key.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(write_failure)?;
        }

        let mut file = fs::File::create(&path).await.map_err(write_failure)?;
        file.write_all(&data).await.map_err(write_failure)?;
        file.sync_all().await.map_err(write_failure)?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            "Local storage write successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::ReadFailure {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;

        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::ReadFailure {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let (dir, name_prefix) = match prefix.rsplit_once('/') {
            Some((dir, name)) => (Some(dir), name),
            None => (None, prefix),
        };

        let dir_path = match dir {
            Some(dir) => self.key_to_path(dir)?,
            None => self.base_path.clone(),
        };

        let mut entries = match fs::read_dir(&dir_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(name_prefix) {
                continue;
            }

            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry {}: {}", name, e);
                    continue;
                }
            };

            let key = match dir {
                Some(dir) => format!("{}/{}", dir, name),
                None => name,
            };

            objects.push(ObjectInfo {
                key,
                content_type: None,
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        Ok(objects)
    }

    async fn make_public(&self, _key: &str) -> StorageResult<Option<String>> {
        // Files are served by the application itself.
        Ok(None)
    }

    fn public_url(&self, _key: &str) -> Option<String> {
        None
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

//! Blob storage behind the photo pipeline.
//!
//! Backends store named byte blobs under flat keys. The photo service owns
//! the key layout (namespace prefix + stored filename); a backend only
//! persists, reads, enumerates and publishes keys.

mod local;
mod s3;

pub use local::LocalStorage;
pub use s3::S3Storage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Archivo no encontrado: {0}")]
    NotFound(String),

    #[error("Nombre de archivo inválido: {0}")]
    InvalidKey(String),

    #[error("Error al guardar {key}: {reason}")]
    WriteFailure { key: String, reason: String },

    #[error("Error al leer {key}: {reason}")]
    ReadFailure { key: String, reason: String },

    #[error("Error de almacenamiento: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One entry of a storage listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Fails with [`StorageError::NotFound`] when the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// All objects whose key starts with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Makes the object publicly readable and returns its URL, or `None`
    /// when the backend has no public URL of its own.
    async fn make_public(&self, key: &str) -> StorageResult<Option<String>>;

    /// Public URL of an already published key, without touching the backend.
    fn public_url(&self, key: &str) -> Option<String>;

    /// Short backend label used in logs and the health report
    fn backend_name(&self) -> &'static str;
}

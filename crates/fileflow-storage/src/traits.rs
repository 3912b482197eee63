//! Storage abstraction trait
//!
//! All storage backends (S3, local filesystem) implement this trait. The
//! stage handlers work against it so tests can substitute an in-memory
//! store.

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Put failed: {0}")]
    PutFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Stat failed: {0}")]
    StatFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size: u64,
    /// Content type recorded at upload time, if the backend keeps one.
    pub content_type: Option<String>,
}

/// Bucket-addressed object storage.
///
/// Keys are `/`-separated paths within a bucket. Deleting a missing object
/// returns `StorageError::NotFound`; callers on idempotent paths treat that
/// as success.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object, replacing any existing one at the same key.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Read up to `len` bytes from the start of the object.
    async fn read_range(&self, bucket: &str, key: &str, len: usize) -> StorageResult<Vec<u8>>;

    /// Size and stored content type of an object.
    async fn stat(&self, bucket: &str, key: &str) -> StorageResult<ObjectInfo>;

    /// Server-side copy. Source is left untouched.
    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<()>;

    /// Delete an object.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;
}

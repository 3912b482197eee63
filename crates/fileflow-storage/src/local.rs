use crate::traits::{ObjectInfo, ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Local filesystem object store. Buckets are directories under the base
/// path; keys are relative paths within a bucket.
///
/// Content types are not persisted; `stat` returns `None` and MIME
/// detection falls back to sniffing and extensions.
#[derive(Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalObjectStore { base_path })
    }

    /// Map bucket + key to a filesystem path, rejecting traversal attempts.
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        for part in [bucket, key] {
            if part.is_empty()
                || part.starts_with('/')
                || part.split('/').any(|seg| seg == ".." || seg == ".")
            {
                return Err(StorageError::InvalidKey(format!("{}/{}", bucket, key)));
            }
        }
        Ok(self.base_path.join(bucket).join(key))
    }
}

fn map_io(err: std::io::Error, key: &str, fallback: fn(String) -> StorageError) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        fallback(err.to_string())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::PutFailed(e.to_string()))?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| StorageError::PutFailed(e.to_string()))?;

        tracing::debug!(bucket, key, "Local put successful");
        Ok(())
    }

    async fn read_range(&self, bucket: &str, key: &str, len: usize) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| map_io(e, key, StorageError::ReadFailed))?;

        let mut buf = vec![0u8; len];
        let mut reader = file.take(len as u64);
        let mut read = 0;
        loop {
            let n = reader
                .read(&mut buf[read..])
                .await
                .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if n == 0 {
                break;
            }
            read += n;
        }
        buf.truncate(read);
        Ok(buf)
    }

    async fn stat(&self, bucket: &str, key: &str) -> StorageResult<ObjectInfo> {
        let path = self.object_path(bucket, key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| map_io(e, key, StorageError::StatFailed))?;
        Ok(ObjectInfo {
            size: meta.len(),
            content_type: None,
        })
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<()> {
        let src = self.object_path(src_bucket, src_key)?;
        let dst = self.object_path(dst_bucket, dst_key)?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::CopyFailed(e.to_string()))?;
        }
        fs::copy(&src, &dst)
            .await
            .map_err(|e| map_io(e, src_key, StorageError::CopyFailed))?;

        tracing::debug!(src_bucket, src_key, dst_bucket, dst_key, "Local copy successful");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| map_io(e, key, StorageError::DeleteFailed))?;

        tracing::debug!(bucket, key, "Local delete successful");
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let path = self.object_path(bucket, key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}

use crate::{LocalObjectStore, ObjectStore, S3ObjectStore, StorageError, StorageResult};
use fileflow_core::config::{Config, StorageBackend};
use std::sync::Arc;

/// Create an object store backend based on configuration.
pub async fn create_object_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            if config.s3_region.is_none() && config.s3_endpoint.is_none() {
                return Err(StorageError::ConfigError(
                    "S3_REGION or S3_ENDPOINT not configured".to_string(),
                ));
            }
            let store =
                S3ObjectStore::new(config.s3_region.clone(), config.s3_endpoint.clone()).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let store = LocalObjectStore::new(base_path).await?;
            Ok(Arc::new(store))
        }
    }
}

//! Storage setup.

use std::sync::Arc;

use anyhow::{Context, Result};

use fileflow_core::Config;
use fileflow_storage::{create_object_store, ObjectStore};

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    tracing::info!(backend = ?config.storage_backend, "Initializing object storage");
    let storage = create_object_store(config)
        .await
        .context("Failed to initialize object storage")?;
    Ok(storage)
}

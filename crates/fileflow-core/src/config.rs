//! Configuration module
//!
//! Environment-backed configuration for the API server, the message
//! consumer, and the storage backends. Every knob has a default so a local
//! run only needs `DATABASE_URL`.

use std::env;

use anyhow::{Context, Result};

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_QUEUE_MAX_WORKERS: usize = 4;
const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_QUEUE_MAX_ATTEMPTS: i32 = 5;
const DEFAULT_QUEUE_REAP_INTERVAL_SECS: u64 = 60;
const DEFAULT_QUEUE_REAP_GRACE_SECS: i64 = 300;

/// Storage backend selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    // Pipeline buckets
    pub upload_bucket: String,
    pub processed_bucket: String,
    // Upload limits
    pub max_upload_bytes: usize,
    // Message queue configuration
    pub queue_max_workers: usize,
    pub queue_poll_interval_ms: u64,
    pub queue_max_attempts: i32,
    /// Interval in seconds between runs of the stale message reaper.
    /// 0 = disabled.
    pub queue_reap_interval_secs: u64,
    /// Age in seconds after which a claimed message is requeued.
    pub queue_reap_grace_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "s3" => StorageBackend::S3,
            "local" => StorageBackend::Local,
            other => anyhow::bail!("Unknown STORAGE_BACKEND: {}", other),
        };

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            server_port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            cors_origins,
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            storage_backend,
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            upload_bucket: env::var("UPLOAD_BUCKET").unwrap_or_else(|_| "uploads".to_string()),
            processed_bucket: env::var("PROCESSED_BUCKET")
                .unwrap_or_else(|_| "processed".to_string()),
            max_upload_bytes: env::var("MAX_UPLOAD_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            queue_max_workers: env::var("QUEUE_MAX_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_MAX_WORKERS),
            queue_poll_interval_ms: env::var("QUEUE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_POLL_INTERVAL_MS),
            queue_max_attempts: env::var("QUEUE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_MAX_ATTEMPTS),
            queue_reap_interval_secs: env::var("QUEUE_REAP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_REAP_INTERVAL_SECS),
            queue_reap_grace_secs: env::var("QUEUE_REAP_GRACE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_REAP_GRACE_SECS),
        })
    }

    /// Fail fast on combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.s3_endpoint.is_none() {
                    anyhow::bail!("S3 backend requires S3_REGION (or AWS_REGION) or S3_ENDPOINT");
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    anyhow::bail!("Local backend requires LOCAL_STORAGE_PATH");
                }
            }
        }
        if self.upload_bucket == self.processed_bucket {
            anyhow::bail!("UPLOAD_BUCKET and PROCESSED_BUCKET must differ");
        }
        Ok(())
    }
}

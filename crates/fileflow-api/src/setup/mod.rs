//! Application setup and initialization.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};

use fileflow_core::Config;
use fileflow_db::{JobRepository, MessageRepository, RuleRepository};
use fileflow_worker::{Consumer, ConsumerConfig, PgMessageChannel, StageContext};

use crate::state::AppState;

/// Initialize the entire application: telemetry, database, storage, the
/// in-process consumer, and the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry();
    tracing::info!("Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let job_repository = JobRepository::new(pool.clone());
    let rule_repository = RuleRepository::new(pool.clone());
    let message_repository = MessageRepository::new(pool.clone());
    let channel = Arc::new(PgMessageChannel::new(
        message_repository.clone(),
        config.queue_max_attempts,
    ));

    let stage_ctx = Arc::new(StageContext::new(
        Arc::new(job_repository.clone()),
        Arc::new(rule_repository.clone()),
        storage.clone(),
        channel.clone(),
        config.processed_bucket.clone(),
    ));

    // The consumer runs inside the API process, woken by LISTEN/NOTIFY.
    let consumer = Arc::new(Consumer::new(
        message_repository.clone(),
        ConsumerConfig {
            max_workers: config.queue_max_workers,
            poll_interval_ms: config.queue_poll_interval_ms,
            stale_reap_interval_secs: config.queue_reap_interval_secs,
            stale_grace_period_secs: config.queue_reap_grace_secs,
        },
        stage_ctx.clone(),
        Some(pool.clone()),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        pool,
        job_repository,
        rule_repository,
        message_repository,
        storage,
        channel,
        stage_ctx,
        consumer,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

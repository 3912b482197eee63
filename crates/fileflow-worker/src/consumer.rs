//! Queue consumer: worker pool, LISTEN/NOTIFY or polling, and retry routing.
//!
//! Shutdown: [`Consumer::shutdown`] signals the pool to stop claiming; it
//! does not wait for in-flight messages. Coordinate with the runtime and
//! give running handlers time to finish before process exit.

use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

use fileflow_core::models::{JobPatch, PipelineEvent, Topic};
use fileflow_core::StageError;
use fileflow_db::{MessageRepository, QueuedMessage, MESSAGE_NOTIFY_CHANNEL};

use crate::context::StageContext;
use crate::stages;

/// Cap on exponential retry backoff so high attempt counts do not produce
/// excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

#[inline]
pub(crate) fn compute_retry_backoff_seconds(attempts: i32) -> u64 {
    (2_u64.pow(attempts.max(0) as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

/// Decode a claimed message into its stage topic and event. An error means
/// the message can never succeed and must be acknowledged and dropped.
pub(crate) fn decode_stage_message(message: &QueuedMessage) -> Result<(Topic, PipelineEvent)> {
    let topic = Topic::from_str(&message.topic)
        .with_context(|| format!("Unknown topic: {}", message.topic))?;
    let event: PipelineEvent = serde_json::from_value(message.payload.clone())
        .context("Undecodable message payload")?;
    Ok((topic, event))
}

#[derive(Clone)]
pub struct ConsumerConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    /// Interval in seconds between runs of the stale message reaper.
    /// 0 = disabled.
    pub stale_reap_interval_secs: u64,
    /// Age in seconds after which an IN_FLIGHT claim is considered
    /// abandoned and requeued.
    pub stale_grace_period_secs: i64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1000,
            stale_reap_interval_secs: 60,
            stale_grace_period_secs: 300,
        }
    }
}

pub struct Consumer {
    shutdown_tx: mpsc::Sender<()>,
}

impl Consumer {
    /// Start the worker pool.
    ///
    /// If `pool` is `Some`, the consumer uses Postgres LISTEN/NOTIFY to wake
    /// immediately when a message is enqueued, in addition to polling at
    /// `poll_interval_ms`. If `pool` is `None`, only polling is used.
    pub fn new(
        repository: MessageRepository,
        config: ConsumerConfig,
        ctx: Arc<StageContext>,
        pool: Option<sqlx::PgPool>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_pool(repository, config, ctx, shutdown_rx, pool).await;
        });

        Self { shutdown_tx }
    }

    async fn worker_pool(
        repository: MessageRepository,
        config: ConsumerConfig,
        ctx: Arc<StageContext>,
        mut shutdown_rx: mpsc::Receiver<()>,
        pool: Option<sqlx::PgPool>,
    ) {
        let use_listen = pool.is_some();
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            listen_notify = use_listen,
            "Message consumer pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Wake channel fed by LISTEN so the select below never blocks on a
        // missing listener.
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        if let Some(pool) = pool {
            tokio::spawn(async move {
                loop {
                    match sqlx::postgres::PgListener::connect_with(&pool).await {
                        Ok(mut listener) => {
                            if let Err(e) = listener.listen(MESSAGE_NOTIFY_CHANNEL).await {
                                tracing::warn!(error = %e, "LISTEN failed, will retry");
                                tokio::time::sleep(Duration::from_secs(5)).await;
                                continue;
                            }
                            while listener.recv().await.is_ok() {
                                let _ = notify_tx.send(()).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "PgListener connect failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }

        // Reaper returns messages stranded IN_FLIGHT by a crashed worker to
        // PENDING so delivery stays at-least-once across process restarts.
        let (reaper_shutdown_tx, mut reaper_shutdown_rx) = mpsc::channel::<()>(1);
        if config.stale_reap_interval_secs > 0 {
            let repo_for_reaper = repository.clone();
            let reap_interval = Duration::from_secs(config.stale_reap_interval_secs);
            let grace_period = config.stale_grace_period_secs;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reap_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = repo_for_reaper.reap_stale_in_flight(grace_period).await {
                                tracing::error!(error = %e, "Stale message reaper failed");
                            }
                        }
                        _ = reaper_shutdown_rx.recv() => break,
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Message consumer pool shutting down");
                    let _ = reaper_shutdown_tx.send(()).await;
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &ctx).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &ctx).await;
                }
            }
        }

        tracing::info!("Message consumer pool stopped");
    }

    async fn claim_and_dispatch_one(
        repository: &MessageRepository,
        semaphore: &Arc<Semaphore>,
        ctx: &Arc<StageContext>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match repository.claim_next().await {
            Ok(Some(message)) => {
                let repo = repository.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = Self::process_message(message, repo, ctx).await {
                        tracing::error!(error = %e, "Message processing failed");
                    }
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No messages available in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim message from queue");
            }
        }
    }

    #[tracing::instrument(skip(repository, ctx), fields(message_id = %message.id, topic = %message.topic))]
    async fn process_message(
        message: QueuedMessage,
        repository: MessageRepository,
        ctx: Arc<StageContext>,
    ) -> Result<()> {
        // Messages that cannot be decoded can never succeed: ack and drop.
        let (topic, event) = match decode_stage_message(&message) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable message, dropping");
                return repository.mark_dropped(message.id).await;
            }
        };

        match stages::dispatch(&ctx, topic, &event).await {
            Ok(()) => repository.mark_done(message.id).await,
            Err(e) if !e.is_retryable() => {
                tracing::warn!(error = %e, "Permanent rejection, dropping message");
                repository.mark_dropped(message.id).await
            }
            Err(e) => {
                if message.attempts >= message.max_attempts {
                    tracing::error!(
                        error = %e,
                        attempts = message.attempts,
                        "Message failed after maximum attempts"
                    );
                    repository.mark_dead(message.id).await?;
                    ctx.jobs
                        .merge_update(
                            &event.job_id,
                            JobPatch::errored(format!(
                                "{} stage failed after {} attempts: {}",
                                topic, message.attempts, e
                            )),
                        )
                        .await?;
                    Err(e.into_inner())
                } else {
                    let backoff = compute_retry_backoff_seconds(message.attempts);
                    tracing::info!(
                        error = %e,
                        attempts = message.attempts,
                        backoff_seconds = backoff,
                        "Scheduling message retry"
                    );
                    repository.retry_later(message.id, backoff).await
                }
            }
        }
    }

    /// Signal the pool to stop claiming new messages. Returns immediately;
    /// in-flight handlers keep running until they finish.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating consumer shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

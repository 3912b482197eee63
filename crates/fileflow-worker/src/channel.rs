//! Outbound message channel abstraction.
//!
//! Stage handlers publish the next stage's event through this trait so tests
//! can substitute a recording fake for the Postgres-backed queue.

use anyhow::{Context, Result};
use async_trait::async_trait;

use fileflow_core::models::{PipelineEvent, Topic};
use fileflow_db::MessageRepository;

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Publish an event to a stage topic.
    async fn publish(&self, topic: Topic, event: &PipelineEvent) -> Result<()>;
}

/// Channel backed by the Postgres message queue.
#[derive(Clone)]
pub struct PgMessageChannel {
    repository: MessageRepository,
    max_attempts: i32,
}

impl PgMessageChannel {
    pub fn new(repository: MessageRepository, max_attempts: i32) -> Self {
        Self {
            repository,
            max_attempts,
        }
    }
}

#[async_trait]
impl MessageChannel for PgMessageChannel {
    async fn publish(&self, topic: Topic, event: &PipelineEvent) -> Result<()> {
        let payload = serde_json::to_value(event).context("Failed to serialize event")?;
        self.repository
            .enqueue(topic.as_str(), payload, self.max_attempts)
            .await?;
        Ok(())
    }
}

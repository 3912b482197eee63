//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use fileflow_core::Config;
use fileflow_db::{JobRepository, MessageRepository, RuleRepository};
use fileflow_storage::ObjectStore;
use fileflow_worker::{Consumer, MessageChannel, StageContext};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub job_repository: JobRepository,
    pub rule_repository: RuleRepository,
    pub message_repository: MessageRepository,
    pub storage: Arc<dyn ObjectStore>,
    pub channel: Arc<dyn MessageChannel>,
    /// Stage dependencies, shared with the in-process consumer and the push
    /// transport handlers.
    pub stage_ctx: Arc<StageContext>,
    /// Held so the consumer pool keeps running for the process lifetime.
    pub consumer: Arc<Consumer>,
}

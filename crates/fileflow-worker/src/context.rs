//! Shared dependencies for the stage handlers.

use std::sync::Arc;

use fileflow_db::{JobStore, RuleStore};
use fileflow_storage::ObjectStore;

use crate::channel::MessageChannel;

/// Everything a stage handler needs: the job record store, the rule store,
/// object storage, the outbound channel, and the fallback destination bucket.
#[derive(Clone)]
pub struct StageContext {
    pub jobs: Arc<dyn JobStore>,
    pub rules: Arc<dyn RuleStore>,
    pub store: Arc<dyn ObjectStore>,
    pub channel: Arc<dyn MessageChannel>,
    pub processed_bucket: String,
}

impl StageContext {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        rules: Arc<dyn RuleStore>,
        store: Arc<dyn ObjectStore>,
        channel: Arc<dyn MessageChannel>,
        processed_bucket: impl Into<String>,
    ) -> Self {
        Self {
            jobs,
            rules,
            store,
            channel,
            processed_bucket: processed_bucket.into(),
        }
    }
}

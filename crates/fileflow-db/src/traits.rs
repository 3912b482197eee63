//! Store trait abstractions
//!
//! The minimal interfaces the stage handlers need from the job and rule
//! stores, allowing in-memory fakes in tests without database dependencies.

use anyhow::Result;
use async_trait::async_trait;

use fileflow_core::models::{Job, JobPatch, Rule};

/// The authoritative per-file record store.
///
/// `merge_update` is the only write path: it upserts the row and merges the
/// populated patch fields, never replacing fields the patch does not carry.
/// Status transitions are monotonic and a COMPLETED job is never regressed.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Apply a partial update, creating the job if it does not exist yet.
    async fn merge_update(&self, job_id: &str, patch: JobPatch) -> Result<()>;

    /// Fetch a job by id.
    async fn get(&self, job_id: &str) -> Result<Option<Job>>;

    /// Most recently updated jobs, newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<Job>>;
}

/// Read access to rule definitions for the act stage.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Enabled rules, ascending by priority; ties keep store order
    /// (creation time, then id) so selection is deterministic.
    async fn list_enabled(&self) -> Result<Vec<Rule>>;
}

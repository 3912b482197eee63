//! Job record repository.
//!
//! The merge-upsert is the concurrency-safety mechanism for the whole
//! pipeline: each stage writes a disjoint subset of columns, NULL patch
//! fields leave existing values alone, and the status guard in SQL keeps the
//! lifecycle monotonic even under duplicate or out-of-order delivery. Jobs
//! are never deleted here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use fileflow_core::models::{Job, JobPatch, JobStatus};

use crate::traits::JobStore;

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: &PgRow) -> Result<Job> {
    let status: String = row.try_get("status")?;

    let json_field = |name: &str| -> Result<Option<serde_json::Value>> {
        Ok(row.try_get::<Option<serde_json::Value>, _>(name)?)
    };

    Ok(Job {
        job_id: row.try_get("job_id")?,
        status: status.parse::<JobStatus>()?,
        source: json_field("source")?
            .map(serde_json::from_value)
            .transpose()
            .context("Malformed source field on job row")?,
        inspection: json_field("inspection")?
            .map(serde_json::from_value)
            .transpose()
            .context("Malformed inspection field on job row")?,
        classification: json_field("classification")?
            .map(serde_json::from_value)
            .transpose()
            .context("Malformed classification field on job row")?,
        action: json_field("action")?
            .map(serde_json::from_value)
            .transpose()
            .context("Malformed action field on job row")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const JOB_COLUMNS: &str = "job_id, status, source, inspection, classification, action, \
                           error_message, created_at, updated_at";

#[async_trait]
impl JobStore for JobRepository {
    #[tracing::instrument(skip(self, patch))]
    async fn merge_update(&self, job_id: &str, patch: JobPatch) -> Result<()> {
        let status = patch.status.map(|s| s.as_str());
        let rank = patch.status.map(|s| s.rank());
        let source = patch
            .source
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to serialize job source")?;
        let inspection = patch
            .inspection
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to serialize inspection")?;
        let classification = patch
            .classification
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to serialize classification")?;
        let action = patch
            .action
            .map(serde_json::to_value)
            .transpose()
            .context("Failed to serialize action record")?;

        // Upsert with per-field merge. The status CASE keeps the lifecycle
        // monotonic: a lower-ranked status never overwrites a higher one,
        // nothing overwrites COMPLETED, and COMPLETED supersedes ERROR so a
        // successful redelivery repairs a job an exhausted retry marked
        // failed. Reaching COMPLETED also clears any stale error message.
        sqlx::query(
            r#"
            INSERT INTO jobs (
                job_id, status, status_rank, source, inspection, classification,
                action, error_message, created_at, updated_at
            )
            VALUES ($1, COALESCE($2, 'UPLOADED'), COALESCE($3, 0), $4, $5, $6, $7, $8, NOW(), NOW())
            ON CONFLICT (job_id) DO UPDATE SET
                status = CASE
                    WHEN $2 IS NULL THEN jobs.status
                    WHEN jobs.status = 'COMPLETED' THEN jobs.status
                    WHEN $2 = 'COMPLETED' THEN $2
                    WHEN $3 > jobs.status_rank THEN $2
                    ELSE jobs.status
                END,
                status_rank = CASE
                    WHEN $3 IS NULL OR jobs.status = 'COMPLETED' THEN jobs.status_rank
                    WHEN $2 = 'COMPLETED' THEN $3
                    ELSE GREATEST(jobs.status_rank, $3)
                END,
                source = COALESCE($4, jobs.source),
                inspection = COALESCE($5, jobs.inspection),
                classification = COALESCE($6, jobs.classification),
                action = COALESCE($7, jobs.action),
                error_message = CASE
                    WHEN $2 = 'COMPLETED' THEN NULL
                    ELSE COALESCE($8, jobs.error_message)
                END,
                updated_at = NOW()
            "#,
        )
        .bind(job_id)
        .bind(status)
        .bind(rank)
        .bind(source)
        .bind(inspection)
        .bind(classification)
        .bind(action)
        .bind(patch.error_message)
        .execute(&self.pool)
        .await
        .context("Failed to merge-update job")?;

        tracing::debug!(job_id, status = ?status, "Job merge-updated");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE job_id = $1",
            JOB_COLUMNS
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch job")?;

        row.as_ref().map(job_from_row).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn recent(&self, limit: i64) -> Result<Vec<Job>> {
        let limit = limit.clamp(1, 1000);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs ORDER BY updated_at DESC LIMIT $1",
            JOB_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recent jobs")?;

        rows.iter().map(job_from_row).collect()
    }
}

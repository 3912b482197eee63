//! Act stage: apply the matched rule's disposition to the object.
//!
//! The storage side effect always happens before the job record is marked
//! COMPLETED, so a crash between the two leaves a redeliverable message and
//! an idempotent handler rather than a record claiming work that never ran.

use chrono::Utc;

use fileflow_core::models::{
    ActionRecord, Disposition, FileMeta, JobPatch, JobStatus, PipelineEvent,
};
use fileflow_core::StageError;
use fileflow_engine::{resolve_actions, select_rule};
use fileflow_storage::StorageError;

use crate::context::StageContext;

#[tracing::instrument(skip(ctx, event), fields(job_id = %event.job_id, blob = %event.blob))]
pub async fn handle(ctx: &StageContext, event: &PipelineEvent) -> Result<(), StageError> {
    // Redelivered message for a finished job: acknowledge without repeating
    // the side effect.
    if let Some(job) = ctx
        .jobs
        .get(&event.job_id)
        .await
        .map_err(StageError::transient)?
    {
        if job.status == JobStatus::Completed {
            tracing::info!("Job already completed, skipping");
            return Ok(());
        }
    }

    let meta = FileMeta::from(event);
    let rules = ctx
        .rules
        .list_enabled()
        .await
        .map_err(StageError::transient)?;

    let disposition = match select_rule(&rules, &meta) {
        Some(rule) => resolve_actions(rule, &meta, &ctx.processed_bucket),
        None => Disposition::default_for(&meta, &ctx.processed_bucket),
    };

    let record = if disposition.delete_only {
        delete_object(ctx, event).await?;
        ActionRecord::Deleted {
            deleted_bucket: event.bucket.clone(),
            deleted_blob: event.blob.clone(),
            tags: disposition.tags,
            rule_id: disposition.rule_id,
            rule_name: disposition.rule_name,
            acted_at: Utc::now(),
        }
    } else {
        let dest_blob = join_dest(&disposition.dest_folder, event.filename());
        move_object(ctx, event, &disposition.dest_bucket, &dest_blob).await?;
        ActionRecord::Moved {
            dest_bucket: disposition.dest_bucket,
            dest_blob,
            dest_folder: disposition.dest_folder,
            classification: meta.classification,
            tags: disposition.tags,
            rule_id: disposition.rule_id,
            rule_name: disposition.rule_name,
            acted_at: Utc::now(),
        }
    };

    ctx.jobs
        .merge_update(&event.job_id, JobPatch::completed(record))
        .await
        .map_err(StageError::transient)?;

    tracing::info!("File action applied, job completed");
    Ok(())
}

fn join_dest(folder: &str, filename: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", folder, filename)
    }
}

/// Delete the source object. A missing object is treated as already deleted.
async fn delete_object(ctx: &StageContext, event: &PipelineEvent) -> Result<(), StageError> {
    match ctx.store.delete(&event.bucket, &event.blob).await {
        Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
        Err(e) => Err(StageError::transient(e)),
    }
}

/// Copy then delete. If the source has vanished but the destination exists,
/// a previous attempt already moved the object and the move is a no-op.
async fn move_object(
    ctx: &StageContext,
    event: &PipelineEvent,
    dest_bucket: &str,
    dest_blob: &str,
) -> Result<(), StageError> {
    match ctx
        .store
        .copy(&event.bucket, &event.blob, dest_bucket, dest_blob)
        .await
    {
        Ok(()) => {}
        Err(StorageError::NotFound(_)) => {
            let already_moved = ctx
                .store
                .exists(dest_bucket, dest_blob)
                .await
                .map_err(StageError::transient)?;
            if !already_moved {
                ctx.jobs
                    .merge_update(
                        &event.job_id,
                        JobPatch::errored(format!(
                            "Object not found: {}/{}",
                            event.bucket, event.blob
                        )),
                    )
                    .await
                    .map_err(StageError::transient)?;
                return Err(StageError::permanent(anyhow::anyhow!(
                    "Object not found: {}/{}",
                    event.bucket,
                    event.blob
                )));
            }
            return Ok(());
        }
        Err(e) => return Err(StageError::transient(e)),
    }

    delete_object(ctx, event).await
}

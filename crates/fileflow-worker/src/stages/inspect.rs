//! Inspect stage: establish what the file actually is.
//!
//! Reads the object's size and a small header from storage, resolves the
//! MIME type, records the result on the job, and forwards the enriched event
//! to the classify stage.

use chrono::Utc;

use fileflow_core::models::{Inspection, JobPatch, JobSource, PipelineEvent, Topic};
use fileflow_core::StageError;
use fileflow_engine::{detect_mime_type, SNIFF_LEN};
use fileflow_storage::StorageError;

use crate::context::StageContext;

#[tracing::instrument(skip(ctx, event), fields(job_id = %event.job_id, blob = %event.blob))]
pub async fn handle(ctx: &StageContext, event: &PipelineEvent) -> Result<(), StageError> {
    let info = match ctx.store.stat(&event.bucket, &event.blob).await {
        Ok(info) => info,
        Err(StorageError::NotFound(_)) => {
            // The object is gone; redelivery cannot bring it back. Record
            // the failure and drop the message.
            tracing::warn!("Object missing at inspect, marking job errored");
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
        Err(e) => return Err(StageError::transient(e)),
    };

    let header = ctx
        .store
        .read_range(&event.bucket, &event.blob, SNIFF_LEN)
        .await
        .map_err(StageError::transient)?;

    let stored_type = event
        .mime_type
        .as_deref()
        .or(info.content_type.as_deref());
    let mime_type = detect_mime_type(&header, stored_type, &event.ext);
    let file_size = if event.file_size > 0 {
        event.file_size
    } else {
        info.size
    };

    let mut patch = JobPatch::inspected(Inspection {
        mime_type: mime_type.clone(),
        file_size,
        inspected_at: Utc::now(),
    });
    // Also write the source so storage-notification events that bypass the
    // upload endpoint still get a complete record.
    patch.source = Some(JobSource {
        bucket: event.bucket.clone(),
        blob: event.blob.clone(),
        name: Some(event.name.clone()),
        content_type: event.mime_type.clone(),
    });
    ctx.jobs
        .merge_update(&event.job_id, patch)
        .await
        .map_err(StageError::transient)?;

    let mut next = event.clone();
    next.mime_type = Some(mime_type);
    next.file_size = file_size;
    ctx.channel
        .publish(Topic::Classify, &next)
        .await
        .map_err(StageError::transient)?;

    tracing::info!(
        mime_type = %next.mime_type.as_deref().unwrap_or(""),
        file_size,
        "File inspected"
    );
    Ok(())
}

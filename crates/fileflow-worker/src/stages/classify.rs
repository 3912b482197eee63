//! Classify stage: assign a category label from MIME type and extension.

use chrono::Utc;

use fileflow_core::models::{Classification, JobPatch, PipelineEvent, Topic};
use fileflow_core::StageError;
use fileflow_engine::classify;

use crate::context::StageContext;

#[tracing::instrument(skip(ctx, event), fields(job_id = %event.job_id, blob = %event.blob))]
pub async fn handle(ctx: &StageContext, event: &PipelineEvent) -> Result<(), StageError> {
    let label = classify(event.mime_type.as_deref(), &event.ext);

    ctx.jobs
        .merge_update(
            &event.job_id,
            JobPatch::classified(Classification {
                label: label.to_string(),
                mime_type: event.mime_type.clone(),
                file_size: Some(event.file_size),
                ext: Some(event.ext.clone()),
                classified_at: Utc::now(),
            }),
        )
        .await
        .map_err(StageError::transient)?;

    let mut next = event.clone();
    next.classification = Some(label.to_string());
    ctx.channel
        .publish(Topic::Act, &next)
        .await
        .map_err(StageError::transient)?;

    tracing::info!(classification = label, "File classified");
    Ok(())
}

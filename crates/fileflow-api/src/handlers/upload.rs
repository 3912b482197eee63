//! Multipart upload endpoint: the front door of the pipeline.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use fileflow_core::models::{synthesize_job_id, JobPatch, JobSource, PipelineEvent, RawEvent, Topic};
use fileflow_core::AppError;
use fileflow_db::JobStore;
use fileflow_worker::MessageChannel;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub bucket: String,
    pub blob: String,
}

/// Keep only characters that are safe in an object key. Everything else
/// becomes an underscore; an empty result falls back to "file".
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidInput("File field has no filename".to_string()))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file body: {}", e)))?;
        file = Some((filename, content_type, data.to_vec()));
        break;
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::InvalidInput("Missing 'file' field".to_string()))?;

    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "{} bytes exceeds max {} bytes",
            data.len(),
            state.config.max_upload_bytes
        ))
        .into());
    }

    let safe_name = sanitize_filename(&filename);
    let blob = format!("uploads/{}__{}", Uuid::new_v4(), safe_name);
    let bucket = state.config.upload_bucket.clone();
    let file_size = data.len() as u64;

    state
        .storage
        .put(&bucket, &blob, data, &content_type)
        .await?;

    let job_id = synthesize_job_id(&bucket, &blob);
    state
        .job_repository
        .merge_update(
            &job_id,
            JobPatch::uploaded(JobSource {
                bucket: bucket.clone(),
                blob: blob.clone(),
                name: Some(safe_name.clone()),
                content_type: Some(content_type.clone()),
            }),
        )
        .await?;

    let event = PipelineEvent::normalize(
        RawEvent {
            job_id: Some(job_id.clone()),
            bucket: Some(bucket.clone()),
            blob: Some(blob.clone()),
            name: Some(safe_name),
            mime_type: Some(content_type),
            file_size: Some(file_size),
            ..RawEvent::default()
        },
        None,
    )
    .ok_or_else(|| AppError::Internal("Upload event failed to normalize".to_string()))?;

    state.channel.publish(Topic::Inspect, &event).await?;

    tracing::info!(%job_id, %blob, file_size, "File uploaded, inspect event published");

    Ok(Json(UploadResponse {
        job_id,
        bucket,
        blob,
    }))
}

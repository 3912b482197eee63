//! Job record lookup.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use fileflow_core::models::Job;
use fileflow_core::AppError;
use fileflow_db::JobStore;

use crate::error::HttpAppError;
use crate::state::AppState;

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, HttpAppError> {
    let job = state
        .job_repository
        .get(&job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job not found: {}", job_id)))?;
    Ok(Json(job))
}

//! Rules CRUD and reordering.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use fileflow_core::models::{CreateRule, Rule, UpdateRule};
use fileflow_core::AppError;

use crate::error::HttpAppError;
use crate::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Rule>>, HttpAppError> {
    let rules = state.rule_repository.list_all().await?;
    Ok(Json(rules))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRule>,
) -> Result<(StatusCode, Json<Rule>), HttpAppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Rule name must not be empty".to_string()).into());
    }
    let rule = state.rule_repository.create(body).await?;
    tracing::info!(rule_id = %rule.id, name = %rule.name, "Rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRule>,
) -> Result<Json<Rule>, HttpAppError> {
    let rule = state
        .rule_repository
        .update(id, body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rule not found: {}", id)))?;
    tracing::info!(rule_id = %rule.id, "Rule updated");
    Ok(Json(rule))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let deleted = state.rule_repository.delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Rule not found: {}", id)).into());
    }
    tracing::info!(rule_id = %id, "Rule deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<Uuid>,
}

/// Rewrite priorities so the given ids evaluate in list order.
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReorderRequest>,
) -> Result<StatusCode, HttpAppError> {
    if body.ids.is_empty() {
        return Err(AppError::InvalidInput("ids must not be empty".to_string()).into());
    }
    state.rule_repository.reorder(&body.ids).await?;
    tracing::info!(count = body.ids.len(), "Rules reordered");
    Ok(StatusCode::NO_CONTENT)
}

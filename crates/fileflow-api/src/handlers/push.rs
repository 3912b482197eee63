//! Push-delivery transport endpoint.
//!
//! Accepts push envelopes carrying a base64 JSON event and runs the named
//! stage inline. Status codes drive the push service's redelivery: 2xx
//! acknowledges, 5xx triggers redelivery. Anything that can never succeed is
//! acknowledged and dropped so the transport does not loop on it.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use fileflow_core::models::{PipelineEvent, RawEvent, Topic};
use fileflow_worker::stages;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub data: String,
    #[serde(default, rename = "messageId")]
    pub message_id: Option<String>,
}

fn decode_event(envelope: &PushEnvelope) -> Result<RawEvent> {
    let bytes = general_purpose::STANDARD
        .decode(&envelope.message.data)
        .context("Envelope data is not valid base64")?;
    serde_json::from_slice(&bytes).context("Envelope data is not a valid event")
}

pub async fn receive(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Json(envelope): Json<PushEnvelope>,
) -> StatusCode {
    let topic: Topic = match topic.parse() {
        Ok(topic) => topic,
        Err(_) => return StatusCode::NOT_FOUND,
    };

    let raw = match decode_event(&envelope) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, %topic, "Malformed push envelope, acknowledging and dropping");
            return StatusCode::NO_CONTENT;
        }
    };

    let event = match PipelineEvent::normalize(raw, Some(&state.config.upload_bucket)) {
        Some(event) => event,
        None => {
            tracing::warn!(%topic, "Event missing bucket or path, acknowledging and dropping");
            return StatusCode::NO_CONTENT;
        }
    };

    match stages::dispatch(&state.stage_ctx, topic, &event).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) if !e.is_retryable() => {
            tracing::warn!(error = %e, %topic, job_id = %event.job_id, "Permanent stage rejection, acknowledging");
            StatusCode::NO_CONTENT
        }
        Err(e) => {
            tracing::error!(error = %e, %topic, job_id = %event.job_id, "Transient stage failure, requesting redelivery");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

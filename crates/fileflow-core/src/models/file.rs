//! Ephemeral per-message metadata and the resolved disposition.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::PipelineEvent;

/// File metadata fed into rule matching. Derived from the event, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub job_id: String,
    pub bucket: String,
    pub blob: String,
    pub name: String,
    pub ext: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub classification: String,
}

impl From<&PipelineEvent> for FileMeta {
    fn from(event: &PipelineEvent) -> Self {
        Self {
            job_id: event.job_id.clone(),
            bucket: event.bucket.clone(),
            blob: event.blob.clone(),
            name: event.name.clone(),
            ext: event.ext.clone(),
            mime_type: event.mime_type.clone(),
            size_bytes: event.file_size,
            classification: event
                .classification
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string()),
        }
    }
}

/// Resolved outcome of rule evaluation: where the file goes, what it is
/// tagged with, and whether it is deleted instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Disposition {
    pub dest_bucket: String,
    pub dest_folder: String,
    pub tags: Vec<String>,
    pub delete_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
}

impl Disposition {
    /// The fallback when no rule matches: file goes to the processed bucket
    /// under its classification label, untouched otherwise.
    pub fn default_for(meta: &FileMeta, processed_bucket: &str) -> Self {
        Self {
            dest_bucket: processed_bucket.to_string(),
            dest_folder: meta.classification.clone(),
            tags: Vec::new(),
            delete_only: false,
            rule_id: None,
            rule_name: None,
        }
    }
}

//! Activity feed: recent jobs mapped to the event shape the UI renders.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fileflow_core::models::{ActionRecord, Job, JobStatus};
use fileflow_db::JobStore;

use crate::error::HttpAppError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub bucket: String,
    pub object: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Coarse UI status buckets: anything in flight is pending, COMPLETED is
/// processed, ERROR is error.
fn ui_status(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Uploaded | JobStatus::Inspected | JobStatus::Classified => "pending",
        JobStatus::Completed => "processed",
        JobStatus::Error => "error",
    }
}

fn to_event(job: Job) -> ActivityEvent {
    let (dest_bucket, dest_blob, dest_folder, rule_name) = match &job.action {
        Some(ActionRecord::Moved {
            dest_bucket,
            dest_blob,
            dest_folder,
            rule_name,
            ..
        }) => (
            Some(dest_bucket.clone()),
            Some(dest_blob.clone()),
            Some(dest_folder.clone()),
            rule_name.clone(),
        ),
        Some(ActionRecord::Deleted { rule_name, .. }) => (None, None, None, rule_name.clone()),
        None => (None, None, None, None),
    };

    let bucket = dest_bucket
        .or_else(|| job.source.as_ref().map(|s| s.bucket.clone()))
        .unwrap_or_default();
    let object = dest_blob
        .or_else(|| job.source.as_ref().map(|s| s.blob.clone()))
        .unwrap_or_default();

    let mut actions = Vec::new();
    if let Some(classification) = &job.classification {
        actions.push(format!("classified:{}", classification.label));
    }
    if let Some(folder) = dest_folder {
        actions.push(format!("moved_to:{}", folder));
    }
    if matches!(job.action, Some(ActionRecord::Deleted { .. })) {
        actions.push("deleted".to_string());
    }

    ActivityEvent {
        id: job.job_id,
        timestamp: job.updated_at,
        bucket,
        object,
        status: ui_status(job.status),
        rule_name,
        actions,
        error_message: job.error_message,
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEvent>>, HttpAppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let jobs = state.job_repository.recent(limit).await?;
    Ok(Json(jobs.into_iter().map(to_event).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileflow_core::models::{Classification, JobSource};

    fn job(status: JobStatus) -> Job {
        Job {
            job_id: "up:uploads%2Fa.csv".to_string(),
            status,
            source: Some(JobSource {
                bucket: "up".to_string(),
                blob: "uploads/a.csv".to_string(),
                name: None,
                content_type: None,
            }),
            inspection: None,
            classification: None,
            action: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn in_flight_statuses_map_to_pending() {
        for status in [
            JobStatus::Uploaded,
            JobStatus::Inspected,
            JobStatus::Classified,
        ] {
            assert_eq!(ui_status(status), "pending");
        }
        assert_eq!(ui_status(JobStatus::Completed), "processed");
        assert_eq!(ui_status(JobStatus::Error), "error");
    }

    #[test]
    fn moved_job_reports_destination() {
        let mut j = job(JobStatus::Completed);
        j.classification = Some(Classification {
            label: "spreadsheets".to_string(),
            mime_type: None,
            file_size: None,
            ext: None,
            classified_at: Utc::now(),
        });
        j.action = Some(ActionRecord::Moved {
            dest_bucket: "processed".to_string(),
            dest_blob: "reports/a.csv".to_string(),
            dest_folder: "reports".to_string(),
            classification: "spreadsheets".to_string(),
            tags: vec![],
            rule_id: None,
            rule_name: Some("csv".to_string()),
            acted_at: Utc::now(),
        });

        let event = to_event(j);
        assert_eq!(event.bucket, "processed");
        assert_eq!(event.object, "reports/a.csv");
        assert_eq!(
            event.actions,
            vec!["classified:spreadsheets", "moved_to:reports"]
        );
        assert_eq!(event.rule_name.as_deref(), Some("csv"));
    }

    #[test]
    fn deleted_job_falls_back_to_source_location() {
        let mut j = job(JobStatus::Completed);
        j.action = Some(ActionRecord::Deleted {
            deleted_bucket: "up".to_string(),
            deleted_blob: "uploads/a.csv".to_string(),
            tags: vec![],
            rule_id: None,
            rule_name: None,
            acted_at: Utc::now(),
        });

        let event = to_event(j);
        assert_eq!(event.bucket, "up");
        assert_eq!(event.object, "uploads/a.csv");
        assert!(event.actions.contains(&"deleted".to_string()));
    }
}

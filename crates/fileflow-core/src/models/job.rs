//! The job record and its state machine.
//!
//! A job is the authoritative per-file record. Stages never replace it; they
//! emit partial updates (`JobPatch`) that the store merges field by field, so
//! concurrent or re-delivered stage messages cannot erase another stage's
//! writes. Status moves forward only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Uploaded,
    Inspected,
    Classified,
    Completed,
    Error,
}

impl JobStatus {
    /// Position in the forward-only lifecycle. `Error` ranks above every
    /// in-flight state so it can be reached from any of them. The store
    /// refuses to overwrite `Completed` regardless of rank, and lets
    /// `Completed` supersede `Error` so a successful redelivery repairs a
    /// job that an exhausted retry marked failed.
    pub fn rank(&self) -> i32 {
        match self {
            JobStatus::Uploaded => 0,
            JobStatus::Inspected => 1,
            JobStatus::Classified => 2,
            JobStatus::Completed => 3,
            JobStatus::Error => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "UPLOADED",
            JobStatus::Inspected => "INSPECTED",
            JobStatus::Classified => "CLASSIFIED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Error => "ERROR",
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOADED" => Ok(JobStatus::Uploaded),
            "INSPECTED" => Ok(JobStatus::Inspected),
            "CLASSIFIED" => Ok(JobStatus::Classified),
            "COMPLETED" => Ok(JobStatus::Completed),
            "ERROR" => Ok(JobStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Where the file entered the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSource {
    pub bucket: String,
    pub blob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Output of the inspect stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inspection {
    pub mime_type: String,
    pub file_size: u64,
    pub inspected_at: DateTime<Utc>,
}

/// Output of the classify stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    pub classified_at: DateTime<Utc>,
}

/// Final outcome of the act stage, recorded on the job for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRecord {
    Moved {
        dest_bucket: String,
        dest_blob: String,
        dest_folder: String,
        classification: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule_name: Option<String>,
        acted_at: DateTime<Utc>,
    },
    Deleted {
        deleted_bucket: String,
        deleted_blob: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule_name: Option<String>,
        acted_at: DateTime<Utc>,
    },
}

/// The authoritative per-file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<JobSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection: Option<Inspection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update emitted by a stage. Only the populated fields are written;
/// the store keeps everything else as-is.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub source: Option<JobSource>,
    pub inspection: Option<Inspection>,
    pub classification: Option<Classification>,
    pub action: Option<ActionRecord>,
    pub error_message: Option<String>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn uploaded(source: JobSource) -> Self {
        Self {
            status: Some(JobStatus::Uploaded),
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn inspected(inspection: Inspection) -> Self {
        Self {
            status: Some(JobStatus::Inspected),
            inspection: Some(inspection),
            ..Self::default()
        }
    }

    pub fn classified(classification: Classification) -> Self {
        Self {
            status: Some(JobStatus::Classified),
            classification: Some(classification),
            ..Self::default()
        }
    }

    pub fn completed(action: ActionRecord) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ranks_are_monotonic() {
        assert!(JobStatus::Uploaded.rank() < JobStatus::Inspected.rank());
        assert!(JobStatus::Inspected.rank() < JobStatus::Classified.rank());
        assert!(JobStatus::Classified.rank() < JobStatus::Completed.rank());
        assert!(JobStatus::Error.rank() > JobStatus::Classified.rank());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            JobStatus::Uploaded,
            JobStatus::Inspected,
            JobStatus::Classified,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn action_record_serializes_tagged() {
        let record = ActionRecord::Deleted {
            deleted_bucket: "up".to_string(),
            deleted_blob: "uploads/a.tmp".to_string(),
            tags: vec![],
            rule_id: None,
            rule_name: Some("cleanup".to_string()),
            acted_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "deleted");
        assert_eq!(json["deleted_blob"], "uploads/a.tmp");
    }
}

//! The canonical pipeline event.
//!
//! Upstream producers are sloppy about shape: the object path arrives as
//! `blob` or `name`, and `job_id` may be missing entirely for
//! storage-notification events. Everything is normalized here, at the single
//! ingress boundary, so the stage handlers only ever see `PipelineEvent`.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Stage topics on the message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Inspect,
    Classify,
    Act,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Inspect => "inspect",
            Topic::Classify => "classify",
            Topic::Act => "act",
        }
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Topic {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inspect" => Ok(Topic::Inspect),
            "classify" => Ok(Topic::Classify),
            "act" => Ok(Topic::Act),
            _ => Err(anyhow::anyhow!("Invalid topic: {}", s)),
        }
    }
}

/// Job ids live in a flat keyspace, so `/` (and the escape character itself)
/// must not survive from object paths into the id.
const JOB_ID_ESCAPE: &AsciiSet = &CONTROLS.add(b'/').add(b'%').add(b':');

/// Derive a stable job id from an object location. Path separators are
/// escaped so `a/b` + `c` can never collide with `a` + `b/c`.
pub fn synthesize_job_id(bucket: &str, blob: &str) -> String {
    format!(
        "{}:{}",
        utf8_percent_encode(bucket, JOB_ID_ESCAPE),
        utf8_percent_encode(blob, JOB_ID_ESCAPE)
    )
}

/// An event as it arrives off the wire, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub blob: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub classification: Option<String>,
}

/// The single canonical event consumed by every stage handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineEvent {
    pub job_id: String,
    pub bucket: String,
    pub blob: String,
    pub name: String,
    pub ext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

impl PipelineEvent {
    /// Normalize a raw event. Returns `None` when the required location
    /// fields are missing; callers treat that as a permanent rejection.
    pub fn normalize(raw: RawEvent, fallback_bucket: Option<&str>) -> Option<Self> {
        let bucket = raw
            .bucket
            .filter(|b| !b.is_empty())
            .or_else(|| fallback_bucket.map(str::to_string))?;
        let blob = raw
            .blob
            .or(raw.name.clone())
            .filter(|b| !b.is_empty())?;

        let job_id = raw
            .job_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| synthesize_job_id(&bucket, &blob));
        let name = raw
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| blob.clone());
        let ext = raw
            .ext
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| extension_of(&name));

        Some(Self {
            job_id,
            bucket,
            blob,
            name,
            ext,
            mime_type: raw.mime_type,
            file_size: raw.file_size.unwrap_or(0),
            classification: raw.classification,
        })
    }

    /// The bare filename, without any folder prefix.
    pub fn filename(&self) -> &str {
        self.blob.rsplit('/').next().unwrap_or(&self.blob)
    }
}

/// Lowercased extension including the leading dot, or empty.
pub fn extension_of(name: &str) -> String {
    let filename = name.rsplit('/').next().unwrap_or(name);
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename[idx..].to_lowercase(),
        _ => String::new(),
    }
}

//! End-to-end stage handler tests against in-memory fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use fileflow_core::models::{
    Action, ActionKind, ActionRecord, Condition, ConditionKind, Job, JobPatch, JobStatus,
    PipelineEvent, Rule, Topic,
};
use fileflow_db::{JobStore, RuleStore};
use fileflow_storage::{ObjectInfo, ObjectStore, StorageError, StorageResult};
use fileflow_worker::{stages, MessageChannel, StageContext};

// In-memory job store with the same merge semantics as the Postgres
// repository: fields coalesce, status only moves forward, COMPLETED wins
// and supersedes ERROR.
#[derive(Default)]
struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn merge_update(&self, job_id: &str, patch: JobPatch) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let now = Utc::now();
        let job = jobs.entry(job_id.to_string()).or_insert_with(|| Job {
            job_id: job_id.to_string(),
            status: patch.status.unwrap_or(JobStatus::Uploaded),
            source: None,
            inspection: None,
            classification: None,
            action: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        });
        if let Some(status) = patch.status {
            if job.status != JobStatus::Completed {
                if status == JobStatus::Completed {
                    job.status = status;
                    job.error_message = None;
                } else if status.rank() > job.status.rank() {
                    job.status = status;
                }
            }
        }
        if patch.source.is_some() {
            job.source = patch.source;
        }
        if patch.inspection.is_some() {
            job.inspection = patch.inspection;
        }
        if patch.classification.is_some() {
            job.classification = patch.classification;
        }
        if patch.action.is_some() {
            job.action = patch.action;
        }
        if patch.error_message.is_some() {
            job.error_message = patch.error_message;
        }
        job.updated_at = now;
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.lock().unwrap().values().cloned().collect();
        jobs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        jobs.truncate(limit as usize);
        Ok(jobs)
    }
}

struct MemoryRuleStore {
    rules: Vec<Rule>,
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn list_enabled(&self) -> Result<Vec<Rule>> {
        let mut rules: Vec<Rule> = self.rules.iter().filter(|r| r.enabled).cloned().collect();
        rules.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(rules)
    }
}

#[derive(Default)]
struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), (Vec<u8>, Option<String>)>>,
    copies: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryObjectStore {
    fn insert(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: Option<&str>) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (data, content_type.map(str::to_string)),
        );
    }

    fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        self.insert(bucket, key, data, Some(content_type));
        Ok(())
    }

    async fn read_range(&self, bucket: &str, key: &str, len: usize) -> StorageResult<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        let (data, _) = objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))?;
        Ok(data.iter().take(len).copied().collect())
    }

    async fn stat(&self, bucket: &str, key: &str) -> StorageResult<ObjectInfo> {
        let objects = self.objects.lock().unwrap();
        let (data, content_type) = objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))?;
        Ok(ObjectInfo {
            size: data.len() as u64,
            content_type: content_type.clone(),
        })
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let entry = objects
            .get(&(src_bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", src_bucket, src_key)))?;
        objects.insert((dst_bucket.to_string(), dst_key.to_string()), entry);
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let removed = self
            .objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        if removed.is_none() {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, key)));
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.contains(bucket, key))
    }
}

#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(Topic, PipelineEvent)>>,
}

impl RecordingChannel {
    fn take(&self) -> Vec<(Topic, PipelineEvent)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn publish(&self, topic: Topic, event: &PipelineEvent) -> Result<()> {
        self.sent.lock().unwrap().push((topic, event.clone()));
        Ok(())
    }
}

struct Harness {
    jobs: Arc<MemoryJobStore>,
    store: Arc<MemoryObjectStore>,
    channel: Arc<RecordingChannel>,
    ctx: StageContext,
}

fn harness(rules: Vec<Rule>) -> Harness {
    let jobs = Arc::new(MemoryJobStore::default());
    let store = Arc::new(MemoryObjectStore::default());
    let channel = Arc::new(RecordingChannel::default());
    let ctx = StageContext::new(
        jobs.clone(),
        Arc::new(MemoryRuleStore { rules }),
        store.clone(),
        channel.clone(),
        "processed",
    );
    Harness {
        jobs,
        store,
        channel,
        ctx,
    }
}

fn rule(name: &str, priority: i32, conditions: Vec<Condition>, actions: Vec<Action>) -> Rule {
    Rule {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        priority,
        enabled: true,
        conditions,
        actions,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn cond(kind: ConditionKind, value: &str) -> Condition {
    Condition {
        kind,
        value: value.to_string(),
    }
}

fn action(kind: ActionKind, value: &str) -> Action {
    Action {
        kind,
        value: value.to_string(),
    }
}

fn event(bucket: &str, blob: &str) -> PipelineEvent {
    PipelineEvent {
        job_id: fileflow_core::models::synthesize_job_id(bucket, blob),
        bucket: bucket.to_string(),
        blob: blob.to_string(),
        name: blob.to_string(),
        ext: fileflow_core::models::extension_of(blob),
        mime_type: None,
        file_size: 0,
        classification: None,
    }
}

#[tokio::test]
async fn csv_flows_through_all_three_stages() {
    let h = harness(vec![rule(
        "csv-to-reports",
        10,
        vec![cond(ConditionKind::Extension, "csv")],
        vec![
            action(ActionKind::MoveToFolder, "reports"),
            action(ActionKind::Tag, "finance"),
        ],
    )]);

    let body = vec![b'a'; 2 * 1024 * 1024];
    h.store.insert("up", "uploads/report.csv", body, None);

    let ev = event("up", "uploads/report.csv");
    stages::inspect::handle(&h.ctx, &ev).await.unwrap();

    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Inspected);
    let inspection = job.inspection.unwrap();
    assert_eq!(inspection.mime_type, "text/csv");
    assert_eq!(inspection.file_size, 2 * 1024 * 1024);

    let sent = h.channel.take();
    assert_eq!(sent.len(), 1);
    let (topic, classify_ev) = &sent[0];
    assert_eq!(*topic, Topic::Classify);
    assert_eq!(classify_ev.mime_type.as_deref(), Some("text/csv"));

    stages::classify::handle(&h.ctx, classify_ev).await.unwrap();
    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Classified);
    assert_eq!(job.classification.unwrap().label, "spreadsheets");

    let sent = h.channel.take();
    let (topic, act_ev) = &sent[0];
    assert_eq!(*topic, Topic::Act);

    stages::act::handle(&h.ctx, act_ev).await.unwrap();
    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    match job.action.unwrap() {
        ActionRecord::Moved {
            dest_bucket,
            dest_blob,
            tags,
            rule_name,
            ..
        } => {
            assert_eq!(dest_bucket, "processed");
            assert_eq!(dest_blob, "reports/report.csv");
            assert_eq!(tags, vec!["finance".to_string()]);
            assert_eq!(rule_name.as_deref(), Some("csv-to-reports"));
        }
        other => panic!("expected Moved, got {:?}", other),
    }
    assert!(!h.store.contains("up", "uploads/report.csv"));
    assert!(h.store.contains("processed", "reports/report.csv"));
    // Act publishes nothing; the pipeline ends here.
    assert!(h.channel.take().is_empty());
}

#[tokio::test]
async fn redelivered_act_message_is_skipped_after_completion() {
    let h = harness(vec![]);
    h.store.insert("up", "a.pdf", b"%PDF-1.7".to_vec(), None);

    let mut ev = event("up", "a.pdf");
    ev.mime_type = Some("application/pdf".to_string());
    ev.file_size = 8;
    ev.classification = Some("pdfs".to_string());

    stages::act::handle(&h.ctx, &ev).await.unwrap();
    let copies = h.store.copies.load(Ordering::SeqCst);
    let deletes = h.store.deletes.load(Ordering::SeqCst);
    assert_eq!(copies, 1);

    stages::act::handle(&h.ctx, &ev).await.unwrap();
    assert_eq!(h.store.copies.load(Ordering::SeqCst), copies);
    assert_eq!(h.store.deletes.load(Ordering::SeqCst), deletes);

    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn delete_action_latches_over_move() {
    let h = harness(vec![rule(
        "purge-tmp",
        0,
        vec![cond(ConditionKind::Extension, ".tmp")],
        vec![
            action(ActionKind::MoveToFolder, "archive"),
            action(ActionKind::Delete, ""),
        ],
    )]);
    h.store.insert("up", "scratch/x.tmp", vec![0u8; 16], None);

    let mut ev = event("up", "scratch/x.tmp");
    ev.classification = Some("uncategorized".to_string());

    stages::act::handle(&h.ctx, &ev).await.unwrap();
    assert!(!h.store.contains("up", "scratch/x.tmp"));
    assert_eq!(h.store.copies.load(Ordering::SeqCst), 0);

    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert!(matches!(job.action, Some(ActionRecord::Deleted { .. })));
}

#[tokio::test]
async fn delete_of_missing_object_still_completes() {
    let h = harness(vec![rule(
        "purge-tmp",
        0,
        vec![cond(ConditionKind::Extension, ".tmp")],
        vec![action(ActionKind::Delete, "")],
    )]);

    let ev = event("up", "scratch/gone.tmp");
    stages::act::handle(&h.ctx, &ev).await.unwrap();

    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn no_matching_rule_routes_by_classification() {
    let h = harness(vec![rule(
        "images-only",
        5,
        vec![cond(ConditionKind::Extension, "png")],
        vec![action(ActionKind::MoveToFolder, "pictures")],
    )]);
    h.store.insert("up", "notes.txt", b"hello".to_vec(), None);

    let mut ev = event("up", "notes.txt");
    ev.classification = Some("text".to_string());

    stages::act::handle(&h.ctx, &ev).await.unwrap();
    assert!(h.store.contains("processed", "text/notes.txt"));

    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    match job.action.unwrap() {
        ActionRecord::Moved {
            dest_folder,
            rule_id,
            ..
        } => {
            assert_eq!(dest_folder, "text");
            assert!(rule_id.is_none());
        }
        other => panic!("expected Moved, got {:?}", other),
    }
}

#[tokio::test]
async fn lowest_priority_match_wins_over_later_rules() {
    let h = harness(vec![
        rule(
            "big-files",
            0,
            vec![cond(ConditionKind::SizeGtMb, "5")],
            vec![action(ActionKind::MoveToFolder, "large")],
        ),
        rule(
            "csv-to-reports",
            10,
            vec![cond(ConditionKind::Extension, "csv")],
            vec![action(ActionKind::MoveToFolder, "reports")],
        ),
    ]);
    h.store.insert("up", "small.csv", vec![b'x'; 1024], None);

    let mut ev = event("up", "small.csv");
    ev.file_size = 1024;
    ev.classification = Some("spreadsheets".to_string());

    // 1 KiB is under the 5 MB threshold, so the priority-0 rule does not
    // match and the csv rule applies.
    stages::act::handle(&h.ctx, &ev).await.unwrap();
    assert!(h.store.contains("processed", "reports/small.csv"));
}

#[tokio::test]
async fn inspect_of_missing_object_is_permanent_and_errors_job() {
    let h = harness(vec![]);
    let ev = event("up", "vanished.bin");

    let err = stages::inspect::handle(&h.ctx, &ev).await.unwrap_err();
    assert!(!err.is_retryable());

    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error_message.unwrap().contains("vanished.bin"));
}

#[tokio::test]
async fn move_of_vanished_source_is_noop_when_destination_exists() {
    let h = harness(vec![]);
    // A previous attempt copied and deleted, then crashed before the record
    // update. Only the destination object remains.
    h.store
        .insert("processed", "pdfs/doc.pdf", b"%PDF-1.7".to_vec(), None);

    let mut ev = event("up", "doc.pdf");
    ev.classification = Some("pdfs".to_string());

    stages::act::handle(&h.ctx, &ev).await.unwrap();
    assert_eq!(h.store.copies.load(Ordering::SeqCst), 0);

    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
    assert!(matches!(job.action, Some(ActionRecord::Moved { .. })));
}

#[tokio::test]
async fn successful_redelivery_supersedes_errored_job() {
    let h = harness(vec![]);
    h.store.insert("up", "doc.pdf", b"%PDF-1.7".to_vec(), None);

    let mut ev = event("up", "doc.pdf");
    ev.classification = Some("pdfs".to_string());

    // An earlier delivery exhausted its retries and marked the job failed.
    h.jobs
        .merge_update(&ev.job_id, JobPatch::errored("act stage failed after 5 attempts"))
        .await
        .unwrap();

    stages::act::handle(&h.ctx, &ev).await.unwrap();
    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
    assert!(h.store.contains("processed", "pdfs/doc.pdf"));
}

#[tokio::test]
async fn late_stage_update_never_regresses_completed() {
    let h = harness(vec![]);
    h.store.insert("up", "doc.pdf", b"%PDF-1.7".to_vec(), None);

    let mut ev = event("up", "doc.pdf");
    ev.mime_type = Some("application/pdf".to_string());
    ev.file_size = 8;
    ev.classification = Some("pdfs".to_string());

    stages::act::handle(&h.ctx, &ev).await.unwrap();

    // A redelivered classify message lands after completion. The record
    // keeps COMPLETED while still absorbing the classification field.
    stages::classify::handle(&h.ctx, &ev).await.unwrap();
    let job = h.jobs.get(&ev.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.classification.is_some());
}

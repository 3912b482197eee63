pub mod event;
pub mod file;
pub mod job;
pub mod rule;

pub use event::{extension_of, synthesize_job_id, PipelineEvent, RawEvent, Topic};
pub use file::{Disposition, FileMeta};
pub use job::{
    ActionRecord, Classification, Inspection, Job, JobPatch, JobSource, JobStatus,
};
pub use rule::{Action, ActionKind, Condition, ConditionKind, CreateRule, Rule, UpdateRule};

//! Stage handlers for the Inspect -> Classify -> Act pipeline.

pub mod act;
pub mod classify;
pub mod inspect;

use fileflow_core::models::{PipelineEvent, Topic};
use fileflow_core::StageError;

use crate::context::StageContext;

/// Route an event to the handler for its topic.
pub async fn dispatch(
    ctx: &StageContext,
    topic: Topic,
    event: &PipelineEvent,
) -> Result<(), StageError> {
    match topic {
        Topic::Inspect => inspect::handle(ctx, event).await,
        Topic::Classify => classify::handle(ctx, event).await,
        Topic::Act => act::handle(ctx, event).await,
    }
}

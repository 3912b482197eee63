//! Fileflow Database Layer
//!
//! Postgres-backed repositories for the job record, the rule store, and the
//! message queue, plus the store traits the stage handlers depend on so
//! tests can substitute in-memory fakes.

pub mod job;
pub mod message;
pub mod rule;
pub mod traits;

pub use job::JobRepository;
pub use message::{MessageRepository, QueuedMessage, MESSAGE_NOTIFY_CHANNEL};
pub use rule::RuleRepository;
pub use traits::{JobStore, RuleStore};

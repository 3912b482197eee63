//! Pipeline worker: stage handlers and the queue consumer that drives them.

pub mod channel;
pub mod consumer;
pub mod context;
pub mod stages;

pub use channel::{MessageChannel, PgMessageChannel};
pub use consumer::{Consumer, ConsumerConfig};
pub use context::StageContext;

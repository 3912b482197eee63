//! Fileflow Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared across all Fileflow components: the job record and its state
//! machine, rule definitions, the normalized pipeline event, and the
//! per-stage error type.

pub mod config;
pub mod error;
pub mod models;
pub mod stage_error;

// Re-export commonly used types
pub use config::Config;
pub use error::AppError;
pub use stage_error::{StageError, StageResultExt};

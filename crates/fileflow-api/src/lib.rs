//! Fileflow API Library
//!
//! HTTP handlers, application state, and setup for the Fileflow service.

mod handlers;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};

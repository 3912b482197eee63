//! Fileflow object storage.
//!
//! The pipeline's move primitive is copy-then-delete; no atomic move is
//! assumed from any backend. Backends implement the bucket-addressed
//! `ObjectStore` trait; the factory picks one from configuration.

mod factory;
mod local;
mod s3;
mod traits;

pub use factory::create_object_store;
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;
pub use traits::{ObjectInfo, ObjectStore, StorageError, StorageResult};

//! Storage module for S3-compatible backends
//!
//! Works against AWS S3 and anything speaking the same API (MinIO, R2, B2).

mod bucket;
mod types;

pub use bucket::Bucket;
pub use types::*;

//! s3-bucket
//!
//! A small get/put client for one bucket on an S3-compatible store.
//!
//! # Modules
//!
//! - `config`: connection options and environment loading
//! - `error`: error taxonomy (`NotFound`, `Transport`, `Configuration`)
//! - `registry`: named handles wired up at application startup
//! - `storage`: the [`Bucket`] handle and fetched [`StoredObject`]s
//!
//! ```no_run
//! use s3_bucket::{Bucket, BucketOptions};
//!
//! # async fn run() -> s3_bucket::Result<()> {
//! let bucket = Bucket::new(
//!     "AKID",
//!     "secret",
//!     "us-east-1",
//!     "testbucket",
//!     BucketOptions::new().with_endpoint("localhost:9000").with_tls(false),
//! )?;
//!
//! bucket.put_object_bytes("greeting", "text/plain", "hello").await?;
//! let object = bucket.get_object("greeting").await?;
//! assert_eq!(object.content_type, "text/plain");
//! let body = object.read_to_vec().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod storage;

pub use config::{BucketConfig, BucketOptions};
pub use error::{BucketError, Result};
pub use registry::BucketRegistry;
pub use storage::{Bucket, StoredObject};

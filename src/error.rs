//! Error types for bucket access

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, BucketError>;

/// Boxed error coming out of the S3 SDK
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Bucket error type
#[derive(Error, Debug)]
pub enum BucketError {
    /// The requested key does not exist in the bucket
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Network, auth, or malformed response from the store
    #[error("S3 transport error: {0}")]
    Transport(#[source] TransportSource),

    /// Invalid input while building a handle or reading config
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BucketError {
    pub(crate) fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BucketError::Transport(Box::new(err))
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BucketError::Configuration(msg.into())
    }

    /// True when the key was absent, as opposed to the request failing
    pub fn is_not_found(&self) -> bool {
        matches!(self, BucketError::NotFound(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, BucketError::Transport(_))
    }
}

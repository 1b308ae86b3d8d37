//! Storage types

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::error::Result;

/// Content type S3 reports for objects stored without one
pub const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

type Body = Pin<Box<dyn AsyncRead + Send>>;

/// An object fetched from the bucket.
///
/// The body is a live stream over the response, read once by one consumer.
/// Dropping the object closes the stream and releases the connection.
pub struct StoredObject {
    body: Body,
    pub content_type: String,
    /// Length the store reported; `None` when it sent no Content-Length
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredObject {
    pub(crate) fn new(
        body: impl AsyncRead + Send + 'static,
        content_type: String,
        content_length: Option<u64>,
    ) -> Self {
        Self {
            body: Box::pin(body),
            content_type,
            content_length,
            etag: None,
            last_modified: None,
        }
    }

    pub(crate) fn with_etag(mut self, etag: Option<String>) -> Self {
        self.etag = etag;
        self
    }

    pub(crate) fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Drain the body into memory, consuming the object
    pub async fn read_to_vec(mut self) -> Result<Vec<u8>> {
        let capacity = self
            .content_length
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        self.body.read_to_end(&mut data).await?;
        Ok(data)
    }
}

impl AsyncRead for StoredObject {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.body.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

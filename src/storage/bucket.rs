//! S3-compatible bucket handle
//!
//! Wraps the AWS SDK client for get/put access to a single bucket.

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{http::HttpResponse, retry::RetryConfig, Credentials, Region},
    error::{ProvideErrorMetadata, SdkError},
    operation::get_object::GetObjectError,
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::{BucketConfig, BucketOptions};
use crate::error::{BucketError, Result};

use super::types::{StoredObject, DEFAULT_CONTENT_TYPE};

/// Handle to one bucket on an S3-compatible store.
///
/// Built once, never mutated. Clones share the underlying SDK client, so a
/// handle can be passed to as many tasks as needed.
#[derive(Clone, Debug)]
pub struct Bucket {
    client: Client,
    bucket: String,
    endpoint: String,
    use_tls: bool,
}

impl Bucket {
    /// Build a handle for `bucket_name`.
    ///
    /// This doesn't create the bucket or talk to the store at all; a wrong
    /// bucket name or unreachable endpoint only shows up on the first request.
    pub fn new(
        access_key: &str,
        secret_key: &str,
        region: &str,
        bucket_name: &str,
        options: BucketOptions,
    ) -> Result<Self> {
        require("access key", access_key)?;
        require("secret key", secret_key)?;
        require("region", region)?;
        require("bucket name", bucket_name)?;
        let endpoint = options.endpoint_url()?;

        let credentials = Credentials::new(access_key, secret_key, None, None, "s3-bucket");

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(options.force_path_style)
            .retry_config(RetryConfig::disabled())
            .build();

        tracing::debug!(
            bucket = %bucket_name,
            endpoint = %endpoint,
            path_style = options.force_path_style,
            "Configured bucket handle"
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: bucket_name.to_string(),
            endpoint,
            use_tls: options.use_tls,
        })
    }

    /// Build a handle from a loaded [`BucketConfig`]
    pub fn from_config(config: &BucketConfig) -> Result<Self> {
        Self::new(
            &config.access_key,
            &config.secret_key,
            &config.region,
            &config.bucket,
            config.options(),
        )
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolved endpoint URL, scheme included
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Fetch an object.
    ///
    /// The returned body has not been read yet. A missing key is reported as
    /// [`BucketError::NotFound`]; everything else the SDK returns is
    /// [`BucketError::Transport`].
    pub async fn get_object(&self, key: &str) -> Result<StoredObject> {
        tracing::debug!(bucket = %self.bucket, key = %key, "Getting object");

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if is_missing_key(&e) {
                    BucketError::NotFound(key.to_string())
                } else {
                    BucketError::transport(e)
                }
            })?;

        let content_type = response
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let content_length = response
            .content_length()
            .and_then(|n| u64::try_from(n).ok());
        let etag = response.e_tag().map(|s| s.to_string());
        let last_modified = response
            .last_modified()
            .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()));

        let body = response.body.into_async_read();
        Ok(StoredObject::new(body, content_type, content_length)
            .with_etag(etag)
            .with_last_modified(last_modified))
    }

    /// Store an object, reading `body` to the end first.
    ///
    /// The SDK needs a body of known length, so the whole stream is buffered
    /// in memory before anything is sent. Fine for objects of a few tens of
    /// megabytes; don't push hundreds of megabytes through here.
    ///
    /// An existing object under `key` is replaced.
    pub async fn put_object_buffered<R>(
        &self,
        key: &str,
        content_type: &str,
        mut body: R,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = Vec::new();
        body.read_to_end(&mut buffer).await?;

        self.put_object_bytes(key, content_type, buffer).await
    }

    /// Store an object the caller already holds in memory
    pub async fn put_object_bytes(
        &self,
        key: &str,
        content_type: &str,
        data: impl Into<Bytes>,
    ) -> Result<()> {
        let data: Bytes = data.into();
        let size = data.len();

        tracing::debug!(bucket = %self.bucket, key = %key, size, "Putting object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(BucketError::transport)?;

        Ok(())
    }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BucketError::config(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// `NoSuchKey` from the service, or a 404 carrying no error code at all.
///
/// Coded 404s such as `NoSuchBucket` mean the handle is wrong, not the key.
fn is_missing_key(err: &SdkError<GetObjectError, HttpResponse>) -> bool {
    let is_404 = err
        .raw_response()
        .map_or(false, |response| response.status().as_u16() == 404);

    match err.as_service_error() {
        Some(service_err) if service_err.is_no_such_key() => true,
        Some(service_err) => is_404 && service_err.code().is_none(),
        None => is_404,
    }
}

//! In-process fake S3 server for integration tests
//!
//! Path-style only: objects are keyed by the decoded request path
//! (`/bucket/key`). Supports GET and PUT, nothing else.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use s3_bucket::{Bucket, BucketOptions};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

const LAST_MODIFIED: &str = "Wed, 12 Oct 2009 17:50:00 GMT";
const REQUEST_ID: &str = "0A49CE4060975EAC";
const ETAG: &str = "\"1b2cf535f27731c974343645a3985328\"";

#[derive(Clone)]
struct FakeObject {
    content_type: Option<String>,
    data: Bytes,
}

/// How a GET for an unknown path is answered
#[derive(Clone, Copy, Default)]
enum MissingReply {
    /// 404 with the `NoSuchKey` XML error
    #[default]
    NoSuchKey,
    /// 404 with a plain-text body and no error code
    Bare,
    /// 404 with the `NoSuchBucket` XML error
    NoSuchBucket,
}

#[derive(Clone, Default)]
struct FakeS3 {
    objects: Arc<RwLock<HashMap<String, FakeObject>>>,
    missing: MissingReply,
}

pub struct FakeS3Server {
    pub addr: SocketAddr,
    state: FakeS3,
    handle: JoinHandle<()>,
}

impl FakeS3Server {
    pub async fn start() -> Self {
        Self::start_with(FakeS3::default()).await
    }

    pub async fn start_bare_not_found() -> Self {
        Self::start_with(FakeS3 {
            missing: MissingReply::Bare,
            ..FakeS3::default()
        })
        .await
    }

    /// Store that answers every miss as if the bucket did not exist
    pub async fn start_no_such_bucket() -> Self {
        Self::start_with(FakeS3 {
            missing: MissingReply::NoSuchBucket,
            ..FakeS3::default()
        })
        .await
    }

    async fn start_with(state: FakeS3) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new().fallback(dispatch).with_state(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state, handle }
    }

    /// Handle pointed at this server with TLS off and path-style addressing
    pub fn bucket(&self, name: &str) -> Bucket {
        Bucket::new(
            "YOUR-ACCESSKEYID",
            "YOUR-SECRETACCESSKEY",
            "us-east-1",
            name,
            BucketOptions::new()
                .with_endpoint(self.addr.to_string())
                .with_tls(false)
                .with_path_style(true),
        )
        .unwrap()
    }

    pub async fn object_count(&self) -> usize {
        self.state.objects.read().await.len()
    }
}

impl Drop for FakeS3Server {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn dispatch(
    State(state): State<FakeS3>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = urlencoding::decode(uri.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| uri.path().to_string());

    match method {
        Method::GET => get(&state, &path).await,
        Method::PUT => put(&state, path, &headers, body).await,
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn get(state: &FakeS3, path: &str) -> Response {
    let objects = state.objects.read().await;
    let Some(object) = objects.get(path) else {
        return missing(state.missing, path);
    };

    let mut response = (StatusCode::OK, object.data.clone()).into_response();
    let response_headers = response.headers_mut();
    if let Some(content_type) = &object.content_type {
        if let Ok(value) = content_type.parse() {
            response_headers.insert(header::CONTENT_TYPE, value);
        }
    } else {
        response_headers.remove(header::CONTENT_TYPE);
    }
    response_headers.insert(header::ETAG, ETAG.parse().unwrap());
    response_headers.insert(header::LAST_MODIFIED, LAST_MODIFIED.parse().unwrap());
    response_headers.insert("x-amz-request-id", REQUEST_ID.parse().unwrap());
    response
}

fn missing(reply: MissingReply, path: &str) -> Response {
    let mut parts = path.splitn(3, '/').skip(1);
    let bucket = parts.next().unwrap_or_default();
    let key = parts.next().unwrap_or_default();

    let (code, message, detail) = match reply {
        MissingReply::Bare => return (StatusCode::NOT_FOUND, "NoSuchKey").into_response(),
        MissingReply::NoSuchKey => (
            "NoSuchKey",
            "The specified key does not exist.",
            format!("<Key>{}</Key>", key),
        ),
        MissingReply::NoSuchBucket => (
            "NoSuchBucket",
            "The specified bucket does not exist",
            format!("<BucketName>{}</BucketName>", bucket),
        ),
    };
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{}</Code>\
         <Message>{}</Message>{}<RequestId>{}</RequestId></Error>",
        code, message, detail, REQUEST_ID
    );

    (
        StatusCode::NOT_FOUND,
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::HeaderName::from_static("x-amz-request-id"), REQUEST_ID),
        ],
        xml,
    )
        .into_response()
}

async fn put(state: &FakeS3, path: String, headers: &HeaderMap, body: Bytes) -> Response {
    let is_chunked = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.contains("aws-chunked"));

    let data = if is_chunked {
        match decode_aws_chunked(&body) {
            Some(data) => data,
            None => {
                return (StatusCode::BAD_REQUEST, "malformed aws-chunked body").into_response()
            }
        }
    } else {
        body
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    state
        .objects
        .write()
        .await
        .insert(path, FakeObject { content_type, data });

    (
        StatusCode::OK,
        [
            (header::ETAG, ETAG),
            (header::HeaderName::from_static("x-amz-request-id"), REQUEST_ID),
        ],
    )
        .into_response()
}

/// Strip `aws-chunked` framing: `<hex-size>[;ext]\r\n<data>\r\n` until a zero chunk
fn decode_aws_chunked(body: &[u8]) -> Option<Bytes> {
    let mut out = Vec::with_capacity(body.len());
    let mut rest = body;
    loop {
        let line_end = rest.windows(2).position(|w| w == b"\r\n")?;
        let line = std::str::from_utf8(&rest[..line_end]).ok()?;
        let size_hex = line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            return Some(Bytes::from(out));
        }
        if rest.len() < size + 2 {
            return None;
        }
        out.extend_from_slice(&rest[..size]);
        rest = &rest[size + 2..];
    }
}

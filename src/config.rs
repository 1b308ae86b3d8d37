//! Configuration for bucket handles

use serde::Deserialize;
use std::env;

use crate::error::{BucketError, Result};

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

/// Environment prefix read by [`BucketConfig::from_env`]
pub const DEFAULT_ENV_PREFIX: &str = "S3";

/// Connection overrides applied on top of the defaults.
///
/// Each `with_*` call replaces the previous value for that field, so when
/// the same field is set twice the later call wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOptions {
    pub endpoint: String,
    pub use_tls: bool,
    /// Address objects as `endpoint/bucket/key` instead of `bucket.endpoint/key`
    pub force_path_style: bool,
}

impl Default for BucketOptions {
    fn default() -> Self {
        BucketOptions {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            use_tls: true,
            force_path_style: false,
        }
    }
}

impl BucketOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Full endpoint URL with the scheme picked by `use_tls`.
    ///
    /// Any scheme already present on `endpoint` is discarded.
    pub fn endpoint_url(&self) -> Result<String> {
        let trimmed = self.endpoint.trim();
        let host = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed,
        };
        let host = host.trim_end_matches('/');
        if host.is_empty() {
            return Err(BucketError::config("endpoint must not be empty"));
        }

        let scheme = if self.use_tls { "https" } else { "http" };
        let resolved = format!("{}://{}", scheme, host);

        let parsed = url::Url::parse(&resolved).map_err(|e| {
            BucketError::config(format!("invalid endpoint {}: {}", self.endpoint, e))
        })?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(BucketError::config(format!(
                "endpoint {} has no host",
                self.endpoint
            )));
        }

        Ok(resolved)
    }
}

/// Everything needed to build a [`crate::Bucket`]
#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub use_tls: Option<bool>,
    #[serde(default)]
    pub force_path_style: Option<bool>,
}

impl BucketConfig {
    /// Load from `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`, `S3_REGION`,
    /// `S3_BUCKET` and the optional `S3_ENDPOINT`, `S3_USE_TLS`,
    /// `S3_FORCE_PATH_STYLE`.
    pub fn from_env() -> Result<Self> {
        Self::from_env_prefixed(DEFAULT_ENV_PREFIX)
    }

    /// Same as [`BucketConfig::from_env`] with a different variable prefix
    pub fn from_env_prefixed(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |name| env::var(name).ok())
    }

    /// Read variables through `lookup` instead of the process environment
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{}_{}", prefix, suffix);
            let value = lookup(&name).filter(|v| !v.trim().is_empty());
            (name, value)
        };
        let required = |suffix: &str| {
            let (name, value) = var(suffix);
            value.ok_or_else(|| {
                BucketError::config(format!("missing environment variable {}", name))
            })
        };
        let flag = |suffix: &str| -> Result<Option<bool>> {
            match var(suffix) {
                (_, None) => Ok(None),
                (name, Some(raw)) => parse_bool(&raw).map(Some).ok_or_else(|| {
                    BucketError::config(format!("{} is not a boolean: {}", name, raw))
                }),
            }
        };

        Ok(BucketConfig {
            access_key: required("ACCESS_KEY_ID")?,
            secret_key: required("SECRET_ACCESS_KEY")?,
            region: required("REGION")?,
            bucket: required("BUCKET")?,
            endpoint: var("ENDPOINT").1,
            use_tls: flag("USE_TLS")?,
            force_path_style: flag("FORCE_PATH_STYLE")?,
        })
    }

    /// Options with unset fields left at their defaults
    pub fn options(&self) -> BucketOptions {
        let mut options = BucketOptions::default();
        if let Some(endpoint) = &self.endpoint {
            options = options.with_endpoint(endpoint.clone());
        }
        if let Some(use_tls) = self.use_tls {
            options = options.with_tls(use_tls);
        }
        if let Some(path_style) = self.force_path_style {
            options = options.with_path_style(path_style);
        }
        options
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

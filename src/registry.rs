//! Named bucket handles wired up at startup

use std::collections::HashMap;

use crate::config::BucketConfig;
use crate::error::Result;
use crate::storage::Bucket;

/// Bucket handles keyed by name.
///
/// Applications fill this once during startup and pass it (or the handles
/// inside it) to whatever needs storage.
#[derive(Debug, Clone, Default)]
pub struct BucketRegistry {
    buckets: HashMap<String, Bucket>,
}

impl BucketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle, returning the one it replaced
    pub fn register(&mut self, name: impl Into<String>, bucket: Bucket) -> Option<Bucket> {
        let name = name.into();
        tracing::debug!(name = %name, bucket = %bucket.bucket(), "Registered bucket");
        self.buckets.insert(name, bucket)
    }

    /// Build a handle from `<prefix>_*` environment variables and register it
    pub fn register_from_env(&mut self, name: &str, prefix: &str) -> Result<&Bucket> {
        let config = BucketConfig::from_env_prefixed(prefix)?;
        self.register_config(name, &config)
    }

    pub fn register_config(&mut self, name: &str, config: &BucketConfig) -> Result<&Bucket> {
        let bucket = Bucket::from_config(config)?;
        self.register(name, bucket);
        Ok(&self.buckets[name])
    }

    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

//! Redis cache client.
//!
//! Thin wrapper over a shared `fred` client: JSON values, per-key TTL, and a
//! bounded timeout on every call. A timeout counts as that operation
//! failing, never as success. Page-granularity entries register themselves
//! in a per-scope index set so invalidation can purge every page at once
//! without a keyspace scan.

use fred::clients::Client as RedisClient;
use fred::interfaces::{KeysInterface, SetsInterface};
use fred::types::Expiration;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache error type.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Cache operation timed out")]
    Timeout,
}

impl From<CacheError> for huddle_common::AppError {
    fn from(err: CacheError) -> Self {
        Self::Redis(err.to_string())
    }
}

/// Redis-backed cache with TTL and explicit invalidation.
#[derive(Clone)]
pub struct Cache {
    redis: Arc<RedisClient>,
    prefix: String,
    op_timeout: Duration,
}

impl Cache {
    /// Create a new cache on a connected client.
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: impl Into<String>, op_timeout: Duration) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
            op_timeout,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, fred::error::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(|e| CacheError::Redis(e.to_string())),
            Err(_) => Err(CacheError::Timeout),
        }
    }

    /// Get a JSON value.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let full = self.full_key(key);

        let raw: Option<String> = self.bounded(self.redis.get(full)).await?;

        match raw {
            Some(json) => {
                debug!(key = %key, "Cache hit");
                let value =
                    serde_json::from_str(&json).map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => {
                debug!(key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Store a JSON value with a TTL.
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: i64,
    ) -> Result<(), CacheError> {
        let full = self.full_key(key);
        let json =
            serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;

        self.bounded(self.redis.set::<(), _, _>(
            full,
            json,
            Some(Expiration::EX(ttl_secs)),
            None,
            false,
        ))
        .await
    }

    /// Store a JSON value that belongs to a scope (e.g. one page of a
    /// conversation). The key is recorded in the scope's index set so
    /// [`Self::purge_scope`] can delete every page at once.
    pub async fn set_page<T: Serialize>(
        &self,
        index_key: &str,
        key: &str,
        value: &T,
        ttl_secs: i64,
    ) -> Result<(), CacheError> {
        self.set_json(key, value, ttl_secs).await?;

        let index = self.full_key(index_key);
        self.bounded(self.redis.sadd::<(), _, _>(index, self.full_key(key)))
            .await
    }

    /// Delete a single key.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let full = self.full_key(key);
        self.bounded(self.redis.del::<(), _>(full)).await
    }

    /// Delete every key registered under a scope's index set, then the index
    /// itself. Insertion invalidates any page's "latest N" ordering, so a
    /// page cache cannot be selectively patched.
    pub async fn purge_scope(&self, index_key: &str) -> Result<(), CacheError> {
        let index = self.full_key(index_key);

        let members: Vec<String> = self.bounded(self.redis.smembers(index.clone())).await?;

        if !members.is_empty() {
            self.bounded(self.redis.del::<(), _>(members)).await?;
        }

        self.bounded(self.redis.del::<(), _>(index)).await?;

        debug!(scope = %index_key, "Purged cache scope");
        Ok(())
    }
}

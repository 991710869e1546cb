//! TTL key-value caching for provider metadata and aggregated results.
//!
//! Two backends implement the same [`CacheStore`] contract: Redis for shared
//! deployments and an in-memory store for tests and single-node use. Raw
//! metadata entries live far longer than aggregated results, since the
//! ranked view is cheap to recompute from cached metadata but expensive to
//! recompute against the provider.
//!
//! The engine only ever talks to a store through [`get_or_miss`] and
//! [`set_or_skip`], which degrade every backend failure to a cache miss or a
//! skipped write: the cache is an optimization, never a correctness
//! dependency.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub mod keys {
    //! Canonical cache key construction.
    //!
    //! Keys are stable, delimiter-joined compositions of semantic parts:
    //! `media:{type}:{id}` for normalized metadata and
    //! `recommendations:{type}:{id}[+{type}:{id}...]` for ranked results
    //! (seed identities sorted, so seed order never changes the key).
    //! Surrounding systems may rely on this scheme for explicit
    //! invalidation; every caller must build keys through these functions.

    use screenmatch_core::MediaIdentity;

    pub const MEDIA_PREFIX: &str = "media";
    pub const RECOMMENDATIONS_PREFIX: &str = "recommendations";

    /// Key for one item's normalized metadata, e.g. `media:movie:603`.
    pub fn media(identity: &MediaIdentity) -> String {
        format!("{}:{}", MEDIA_PREFIX, identity)
    }

    /// Key for an aggregated result, e.g. `recommendations:tv:1396` or
    /// `recommendations:movie:603+tv:1396` for multi-seed calls.
    pub fn recommendations(seeds: &[MediaIdentity]) -> String {
        let mut sorted = seeds.to_vec();
        sorted.sort();
        sorted.dedup();
        let joined = sorted
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("+");
        format!("{}:{}", RECOMMENDATIONS_PREFIX, joined)
    }
}

/// Error types for cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A key-value store with per-entry TTL and JSON values.
///
/// A read after expiry behaves exactly like a miss; writes always set a
/// fresh expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

/// Read a typed value, degrading any backend error to a miss.
pub async fn get_or_miss<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    match store.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(typed) => {
                debug!(key = %key, "cache hit");
                Some(typed)
            }
            Err(error) => {
                warn!(key = %key, %error, "cache entry failed to deserialize, treating as miss");
                None
            }
        },
        Ok(None) => {
            debug!(key = %key, "cache miss");
            None
        }
        Err(error) => {
            warn!(key = %key, %error, "cache read failed, treating as miss");
            None
        }
    }
}

/// Write a typed value, degrading any backend error to a no-op.
pub async fn set_or_skip<T: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(error) => {
            warn!(key = %key, %error, "cache value failed to serialize, skipping write");
            return;
        }
    };
    if let Err(error) = store.set(key, value, ttl).await {
        warn!(key = %key, %error, "cache write failed, skipping");
    }
}

/// Redis-backed cache store over a pooled connection manager.
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl RedisCacheStore {
    /// Connect and verify the backend with a ping.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        info!("Initializing Redis cache connection");

        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;

        info!("Redis cache initialized");
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(&value)?;
        let mut conn = self.manager.clone();
        // Redis expiries are second-granular; never round a positive TTL
        // down to "no expiry".
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, json, seconds).await?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: u64 = conn.del(key).await?;
        Ok(())
    }
}

/// In-memory cache store with per-entry expiry.
///
/// Backs tests and single-node deployments. Uses the tokio clock, so paused
/// test time drives expiry deterministically.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, (Value, Instant)>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                let (value, expires_at) = entry.value();
                if Instant::now() < *expires_at {
                    return Ok(Some(value.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Drop one item's cached metadata, using the documented key scheme.
pub async fn invalidate_media(
    store: &dyn CacheStore,
    identity: &screenmatch_core::MediaIdentity,
) -> Result<(), CacheError> {
    store.invalidate(&keys::media(identity)).await
}

/// Drop a cached aggregated result for the given seed set.
pub async fn invalidate_recommendations(
    store: &dyn CacheStore,
    seeds: &[screenmatch_core::MediaIdentity],
) -> Result<(), CacheError> {
    store.invalidate(&keys::recommendations(seeds)).await
}

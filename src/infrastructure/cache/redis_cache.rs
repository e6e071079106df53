//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, ResolutionCache, remaining_ttl};
use crate::domain::entities::LinkStats;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Key prefix for short code → URL mappings.
const URL_PREFIX: &str = "link:";
/// Key prefix for statistics snapshots.
const STATS_PREFIX: &str = "stats:";
/// Lifetime of the auxiliary access counter key.
const COUNTER_TTL_SECS: i64 = 86_400;

/// Redis cache implementation for fast URL lookups.
///
/// Uses connection pooling via `ConnectionManager` for efficient connection
/// reuse. Every operation runs under a short timeout and is fail-open:
/// errors and timeouts are logged but never propagate to callers, so a hung
/// or absent Redis can delay a redirect by at most the configured timeout.
pub struct RedisCache {
    client: ConnectionManager,
    stats_ttl: u64,
    op_timeout: Duration,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and
    /// configures TTL and timeout policy.
    ///
    /// The connection is established once at startup; `ConnectionManager`
    /// owns reconnection from then on.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `stats_ttl_seconds` - TTL applied to statistics snapshots
    ///   (`STATS_CACHE_TTL_SECONDS` env var)
    /// - `op_timeout` - Upper bound on any single cache operation
    ///   (`CACHE_OP_TIMEOUT_MS` env var)
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the
    /// connection cannot be established, or the PING health check fails.
    pub async fn connect(
        redis_url: &str,
        stats_ttl_seconds: u64,
        op_timeout: Duration,
    ) -> CacheResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            stats_ttl: stats_ttl_seconds,
            op_timeout,
        })
    }

    fn url_key(&self, short_code: &str) -> String {
        format!("{}{}", URL_PREFIX, short_code)
    }

    fn stats_key(&self, short_code: &str) -> String {
        format!("{}{}", STATS_PREFIX, short_code)
    }

    fn counter_key(&self, short_code: &str) -> String {
        format!("{}{}:count", STATS_PREFIX, short_code)
    }

    /// Runs one Redis operation under the configured timeout.
    ///
    /// Returns `None` on error or timeout; the caller treats that as a miss.
    async fn run<T>(
        &self,
        op: &str,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> Option<T> {
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!("Redis {} error: {}", op, e);
                None
            }
            Err(_) => {
                warn!("Redis {} timed out after {:?}", op, self.op_timeout);
                None
            }
        }
    }
}

#[async_trait]
impl ResolutionCache for RedisCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        let key = self.url_key(short_code);
        let mut conn = self.client.clone();

        let result = self
            .run("GET", async move { conn.get::<_, Option<String>>(&key).await })
            .await
            .flatten();

        match &result {
            Some(url) => debug!("Cache HIT: {} -> {}", short_code, url),
            None => debug!("Cache MISS: {}", short_code),
        }

        Ok(result)
    }

    async fn put_url(
        &self,
        short_code: &str,
        original_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()> {
        let Some(ttl) = remaining_ttl(expires_at) else {
            debug!("Cache SKIP (already expired): {}", short_code);
            return Ok(());
        };

        let key = self.url_key(short_code);
        let mut conn = self.client.clone();
        let url = original_url.to_string();

        match ttl {
            Some(seconds) => {
                self.run("SETEX", async move {
                    conn.set_ex::<_, _, ()>(&key, url, seconds).await
                })
                .await;
                debug!(
                    "Cache SET: {} -> {} (TTL: {}s)",
                    short_code, original_url, seconds
                );
            }
            None => {
                self.run("SET", async move { conn.set::<_, _, ()>(&key, url).await })
                    .await;
                debug!("Cache SET: {} -> {}", short_code, original_url);
            }
        }

        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        let keys = [self.url_key(short_code), self.stats_key(short_code)];
        let mut conn = self.client.clone();

        if let Some(deleted) = self
            .run("DEL", async move { conn.del::<_, i32>(&keys[..]).await })
            .await
            && deleted > 0
        {
            debug!("Cache INVALIDATE: {}", short_code);
        }

        Ok(())
    }

    async fn bump_access_count(&self, short_code: &str) -> CacheResult<()> {
        let key = self.counter_key(short_code);
        let mut conn = self.client.clone();

        self.run("INCR", async move {
            let count: i64 = conn.incr(&key, 1).await?;
            // Counter keys are created lazily; bound their lifetime on the
            // first increment.
            if count == 1 {
                conn.expire::<_, ()>(&key, COUNTER_TTL_SECS).await?;
            }
            Ok(count)
        })
        .await;

        Ok(())
    }

    async fn get_stats(&self, short_code: &str) -> CacheResult<Option<LinkStats>> {
        let key = self.stats_key(short_code);
        let mut conn = self.client.clone();

        let payload = self
            .run("GET", async move { conn.get::<_, Option<String>>(&key).await })
            .await
            .flatten();

        let Some(payload) = payload else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(stats) => Ok(Some(stats)),
            Err(e) => {
                warn!("Discarding malformed stats snapshot for {}: {}", short_code, e);
                Ok(None)
            }
        }
    }

    async fn put_stats(&self, short_code: &str, stats: &LinkStats) -> CacheResult<()> {
        let payload = match serde_json::to_string(stats) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize stats for {}: {}", short_code, e);
                return Ok(());
            }
        };

        let key = self.stats_key(short_code);
        let ttl = self.stats_ttl;
        let mut conn = self.client.clone();

        self.run("SETEX", async move {
            conn.set_ex::<_, _, ()>(&key, payload, ttl).await
        })
        .await;

        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        matches!(
            timeout(self.op_timeout, conn.ping::<()>()).await,
            Ok(Ok(()))
        )
    }
}

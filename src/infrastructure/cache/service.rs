//! Resolution cache trait, TTL policy, and error types.

use crate::domain::entities::LinkStats;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// TTL decision for a cache write, derived from the link's expiry.
///
/// - `None` - the link is already expired; the write must be skipped
///   (a dead link is never cached)
/// - `Some(None)` - no expiry; store without a TTL
/// - `Some(Some(secs))` - store with the remaining lifetime as TTL
pub fn remaining_ttl(expires_at: Option<DateTime<Utc>>) -> Option<Option<u64>> {
    match expires_at {
        None => Some(None),
        Some(at) => {
            let secs = (at - Utc::now()).num_seconds();
            if secs <= 0 { None } else { Some(Some(secs as u64)) }
        }
    }
}

/// Trait for caching short code → URL mappings and statistics snapshots.
///
/// Implementations must be thread-safe and fail open: a cache that is down,
/// slow, or unconfigured degrades every operation to a miss or a no-op and
/// never propagates an error into the request path. Callers fall through to
/// the durable store on a miss.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with per-key TTL
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    /// Retrieves the original URL for a short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(url))` on cache hit
    /// - `Ok(None)` on cache miss or error (fail-open behavior)
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>>;

    /// Stores a URL mapping with TTL aligned to the link's expiry.
    ///
    /// The TTL is the time remaining until `expires_at`; a link without an
    /// expiry is stored without a TTL. If `expires_at` is already in the
    /// past the write is skipped entirely (see [`remaining_ttl`]).
    ///
    /// # Errors
    ///
    /// Should not propagate errors to callers. Implementations log errors
    /// and return `Ok(())` to avoid disrupting the request flow.
    async fn put_url(
        &self,
        short_code: &str,
        original_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()>;

    /// Removes the cached URL mapping and statistics snapshot for a code.
    ///
    /// Called on every update or delete.
    async fn invalidate(&self, short_code: &str) -> CacheResult<()>;

    /// Increments the auxiliary per-code access counter.
    ///
    /// This counter is independent of the authoritative `access_count`
    /// column; it absorbs write pressure ahead of reconciliation and may
    /// lose updates when the cache is down.
    async fn bump_access_count(&self, short_code: &str) -> CacheResult<()>;

    /// Retrieves a cached statistics snapshot, if present.
    async fn get_stats(&self, short_code: &str) -> CacheResult<Option<LinkStats>>;

    /// Stores a statistics snapshot under the configured snapshot TTL.
    async fn put_stats(&self, short_code: &str, stats: &LinkStats) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}

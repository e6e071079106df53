//! No-op cache implementation for testing or disabled caching.

use super::service::{CacheResult, ResolutionCache};
use crate::domain::entities::LinkStats;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when Redis is unavailable or caching is explicitly disabled: every
/// read is a miss, every write is a no-op, and the resolver falls through to
/// the durable store on every request.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolutionCache for NullCache {
    async fn get_url(&self, _short_code: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn put_url(
        &self,
        _short_code: &str,
        _original_url: &str,
        _expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _short_code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn bump_access_count(&self, _short_code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn get_stats(&self, _short_code: &str) -> CacheResult<Option<LinkStats>> {
        Ok(None)
    }

    async fn put_stats(&self, _short_code: &str, _stats: &LinkStats) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

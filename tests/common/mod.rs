#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};

use snaplink::application::services::LinkResolver;
use snaplink::domain::access_event::AccessEvent;
use snaplink::domain::entities::LinkStats;
use snaplink::infrastructure::cache::{CacheResult, ResolutionCache, remaining_ttl};
use snaplink::infrastructure::persistence::MemoryLinkRepository;

/// In-memory cache with real TTL semantics.
///
/// Applies the same write policy as the Redis implementation (via
/// [`remaining_ttl`]) and emulates per-key expiry on reads, so the
/// write-through protocol can be exercised end to end without Redis.
#[derive(Default)]
pub struct TestCache {
    urls: Mutex<HashMap<String, (String, Option<DateTime<Utc>>)>>,
    stats: Mutex<HashMap<String, LinkStats>>,
    counters: Mutex<HashMap<String, i64>>,
}

impl TestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently cached URL for a code, honoring expiry.
    pub async fn cached_url(&self, code: &str) -> Option<String> {
        self.get_url(code).await.unwrap()
    }

    /// Current value of the auxiliary access counter.
    pub async fn counter(&self, code: &str) -> i64 {
        *self.counters.lock().await.get(code).unwrap_or(&0)
    }

    /// Whether a stats snapshot is cached for the code.
    pub async fn has_stats(&self, code: &str) -> bool {
        self.stats.lock().await.contains_key(code)
    }
}

#[async_trait]
impl ResolutionCache for TestCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        let mut urls = self.urls.lock().await;

        let expired = urls
            .get(short_code)
            .is_some_and(|(_, expires_at)| expires_at.is_some_and(|at| at <= Utc::now()));
        if expired {
            urls.remove(short_code);
            return Ok(None);
        }

        Ok(urls.get(short_code).map(|(url, _)| url.clone()))
    }

    async fn put_url(
        &self,
        short_code: &str,
        original_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> CacheResult<()> {
        // Same skip-the-dead-link policy as RedisCache.
        if remaining_ttl(expires_at).is_none() {
            return Ok(());
        }

        self.urls.lock().await.insert(
            short_code.to_string(),
            (original_url.to_string(), expires_at),
        );
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        self.urls.lock().await.remove(short_code);
        self.stats.lock().await.remove(short_code);
        Ok(())
    }

    async fn bump_access_count(&self, short_code: &str) -> CacheResult<()> {
        *self
            .counters
            .lock()
            .await
            .entry(short_code.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    async fn get_stats(&self, short_code: &str) -> CacheResult<Option<LinkStats>> {
        Ok(self.stats.lock().await.get(short_code).cloned())
    }

    async fn put_stats(&self, short_code: &str, stats: &LinkStats) -> CacheResult<()> {
        self.stats
            .lock()
            .await
            .insert(short_code.to_string(), stats.clone());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// A fully wired resolver over the in-memory repository and [`TestCache`].
pub struct TestHarness {
    pub resolver: Arc<LinkResolver<MemoryLinkRepository>>,
    pub repository: Arc<MemoryLinkRepository>,
    pub cache: Arc<TestCache>,
    pub access_rx: mpsc::Receiver<AccessEvent>,
}

pub fn harness() -> TestHarness {
    let repository = Arc::new(MemoryLinkRepository::new());
    let cache = Arc::new(TestCache::new());
    let (access_tx, access_rx) = mpsc::channel(1024);

    let dyn_cache: Arc<dyn ResolutionCache> = cache.clone();
    let resolver = Arc::new(LinkResolver::new(
        Arc::clone(&repository),
        dyn_cache,
        access_tx,
        6,
    ));

    TestHarness {
        resolver,
        repository,
        cache,
        access_rx,
    }
}

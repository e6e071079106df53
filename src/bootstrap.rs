//! Startup wiring: connections, workers, and the cleanup schedule.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::application::services::{CleanupService, LinkResolver};
use crate::config::Config;
use crate::domain::access_worker::run_access_worker;
use crate::infrastructure::cache::{NullCache, RedisCache, ResolutionCache};
use crate::infrastructure::persistence::{PgLinkRepository, connect_pool};
use crate::state::AppState;

/// Builds and starts the shortening core.
///
/// Initializes, in order:
/// - the PostgreSQL connection pool
/// - the Redis resolution cache (or [`NullCache`] fallback)
/// - the background access worker
/// - the cleanup scheduler
///
/// Connections are established once here; neither the resolver nor the cache
/// reconnects lazily behind a getter.
///
/// # Errors
///
/// Returns an error only if the database connection fails - the store is
/// authoritative and has no fallback. A failed Redis connection degrades to
/// [`NullCache`] and is logged, never fatal.
pub async fn start(config: Config) -> Result<AppState> {
    config.log_summary();

    let pool = connect_pool(&config).await?;
    tracing::info!("Connected to database");

    let op_timeout = Duration::from_millis(config.cache_op_timeout_ms);
    let cache: Arc<dyn ResolutionCache> = if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url, config.stats_cache_ttl_seconds, op_timeout).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache::new())
    };

    let (access_tx, access_rx) = mpsc::channel(config.access_queue_capacity);

    let repository = Arc::new(PgLinkRepository::new(Arc::new(pool.clone())));
    let resolver = Arc::new(LinkResolver::new(
        Arc::clone(&repository),
        Arc::clone(&cache),
        access_tx,
        config.shortcode_length,
    ));

    tokio::spawn(run_access_worker(access_rx, Arc::clone(&resolver)));
    tracing::info!("Access worker started");

    let cleanup = Arc::new(CleanupService::new(
        repository,
        Arc::clone(&resolver),
        config.cleanup_unused_days,
    ));

    let cleanup_interval = Duration::from_secs(config.cleanup_interval_hours * 3600);
    tokio::spawn(Arc::clone(&cleanup).run_scheduler(cleanup_interval));
    tracing::info!(
        "Cleanup scheduler started (every {}h)",
        config.cleanup_interval_hours
    );

    Ok(AppState {
        resolver,
        cleanup,
        cache,
        pool,
    })
}

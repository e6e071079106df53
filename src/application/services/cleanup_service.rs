//! Periodic cleanup of expired and unused links.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use metrics::counter;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::application::services::LinkResolver;
use crate::domain::entities::Link;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Outcome of one cleanup sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub expired_removed: u64,
    pub unused_removed: u64,
    pub failed: u64,
}

/// Background sweep that hard-deletes expired and unused links.
///
/// Removals go through the resolver's shared remove path, so the store
/// delete and the cache invalidation can never diverge from the interactive
/// delete operation. The sweep competes for the store with ordinary
/// per-statement queries and holds no lock that could block concurrent
/// resolutions.
pub struct CleanupService<R: LinkRepository> {
    repository: Arc<R>,
    resolver: Arc<LinkResolver<R>>,
    unused_threshold_days: i64,
}

impl<R: LinkRepository> CleanupService<R> {
    /// Creates a new cleanup service.
    ///
    /// `unused_threshold_days` of zero disables the unused-link sweep;
    /// expired links are always swept.
    pub fn new(
        repository: Arc<R>,
        resolver: Arc<LinkResolver<R>>,
        unused_threshold_days: i64,
    ) -> Self {
        Self {
            repository,
            resolver,
            unused_threshold_days,
        }
    }

    /// Runs one sweep over expired and unused links.
    ///
    /// A link whose removal fails is counted and skipped; the batch always
    /// runs to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] only when the candidate queries
    /// themselves fail.
    pub async fn run_once(&self) -> Result<CleanupReport, AppError> {
        let now = Utc::now();
        let mut report = CleanupReport::default();

        let expired = self.repository.find_expired(now).await?;
        let (removed, failed) = self.remove_batch(&expired).await;
        report.expired_removed = removed;
        report.failed += failed;

        if self.unused_threshold_days > 0 {
            let cutoff = now - ChronoDuration::days(self.unused_threshold_days);
            let unused = self.repository.find_unused(cutoff).await?;
            let (removed, failed) = self.remove_batch(&unused).await;
            report.unused_removed = removed;
            report.failed += failed;
        }

        counter!("snaplink_cleanup_removed_total")
            .increment(report.expired_removed + report.unused_removed);
        counter!("snaplink_cleanup_failed_total").increment(report.failed);

        Ok(report)
    }

    /// Runs the sweep on a fixed interval until the task is aborted.
    ///
    /// The first sweep runs immediately. A failed cycle is logged and the
    /// schedule continues - one bad cycle never stops future cycles.
    pub async fn run_scheduler(self: Arc<Self>, every: Duration) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.run_once().await {
                Ok(report) => info!(
                    "Cleanup sweep done: {} expired, {} unused removed, {} failed",
                    report.expired_removed, report.unused_removed, report.failed
                ),
                Err(e) => error!("Cleanup sweep failed: {}", e),
            }
        }
    }

    async fn remove_batch(&self, links: &[Link]) -> (u64, u64) {
        let mut removed = 0;
        let mut failed = 0;

        for link in links {
            match self.resolver.remove(link).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    failed += 1;
                    warn!("Failed to remove link {}: {}", link.short_code, e);
                }
            }
        }

        (removed, failed)
    }
}

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, trace};

use crate::application::services::LinkResolver;
use crate::domain::access_event::AccessEvent;
use crate::domain::repositories::LinkRepository;

/// Drains the access-event queue and applies each event to the store.
///
/// Each event is retried a bounded number of times with jittered backoff;
/// an event that still fails is logged and dropped, never retried forever.
/// The worker exits when every sender has been dropped.
pub async fn run_access_worker<R: LinkRepository>(
    mut rx: mpsc::Receiver<AccessEvent>,
    resolver: Arc<LinkResolver<R>>,
) {
    while let Some(ev) = rx.recv().await {
        trace!(code = %ev.short_code, ip = ?ev.ip, "processing access event");

        let backoff = ExponentialBackoff::from_millis(50).map(jitter).take(2);
        match Retry::spawn(backoff, || resolver.record_access(&ev.short_code)).await {
            Ok(true) => counter!("snaplink_accesses_recorded_total").increment(1),
            Ok(false) => {
                // The link was deleted between resolution and recording.
                debug!(code = %ev.short_code, "access event for a vanished link");
            }
            Err(e) => {
                error!(code = %ev.short_code, "failed to record access after retries: {e}");
                counter!("snaplink_accesses_failed_total").increment(1);
            }
        }
    }

    debug!("access event channel closed, worker exiting");
}

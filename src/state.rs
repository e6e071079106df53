//! Shared application state handed to an embedding layer.

use std::sync::Arc;

use sqlx::PgPool;

use crate::application::services::{CleanupService, LinkResolver};
use crate::infrastructure::cache::ResolutionCache;
use crate::infrastructure::persistence::PgLinkRepository;

/// Handles to the running core, as produced by [`crate::bootstrap::start`].
///
/// Cloning is cheap; every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<LinkResolver<PgLinkRepository>>,
    pub cleanup: Arc<CleanupService<PgLinkRepository>>,
    pub cache: Arc<dyn ResolutionCache>,
    pub pool: PgPool,
}

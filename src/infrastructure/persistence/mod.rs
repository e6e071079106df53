//! Persistence layer implementations of the link repository.
//!
//! - [`PgLinkRepository`] - PostgreSQL-backed authoritative store
//! - [`MemoryLinkRepository`] - DashMap-backed store for tests and
//!   single-process deployments

mod memory_link_repository;
mod pg_link_repository;

pub use memory_link_repository::MemoryLinkRepository;
pub use pg_link_repository::PgLinkRepository;

use crate::config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Opens the PostgreSQL connection pool using the configured limits.
///
/// This is the single initialization step for the durable store; the pool is
/// established once at startup and shared by reference from then on.
///
/// # Errors
///
/// Returns the underlying `sqlx` error if the pool cannot be created.
pub async fn connect_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
}

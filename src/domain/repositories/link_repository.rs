//! Repository trait for short link data access.

use crate::domain::entities::{Link, LinkUpdate, NewLink};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for the durable link store.
///
/// The store is the authoritative record; it enforces the uniqueness of
/// `short_code` through a unique constraint, which makes insertion the final
/// arbiter of alias availability regardless of earlier `exists` pre-checks.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - DashMap-backed,
///   for tests and cache-less deployments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code is already taken and
    /// [`AppError::Internal`] on other database errors.
    async fn insert(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Returns whether any link occupies the given short code.
    ///
    /// Expired and inactive links still occupy their code until swept.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn exists(&self, code: &str) -> Result<bool, AppError>;

    /// Partially updates a link. `None` fields in [`LinkUpdate`] are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link matches `code`.
    /// Returns [`AppError::Internal`] on database errors.
    async fn update(&self, code: &str, update: LinkUpdate) -> Result<Link, AppError>;

    /// Deletes a link.
    ///
    /// Returns `Ok(true)` if the link was found and deleted, `Ok(false)` if
    /// it was already gone.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn delete(&self, code: &str) -> Result<bool, AppError>;

    /// Atomically increments `access_count` and stamps `last_accessed_at`.
    ///
    /// The increment must happen in-place in the store (never read-modify-write
    /// on a stale snapshot) so that N concurrent calls are each reflected.
    ///
    /// Returns `Ok(false)` if the link no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn record_access(&self, code: &str) -> Result<bool, AppError>;

    /// Lists links whose `expires_at` is non-null and strictly before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError>;

    /// Lists links last accessed before `cutoff`, or never accessed and
    /// created before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_unused(&self, cutoff: DateTime<Utc>) -> Result<Vec<Link>, AppError>;
}

//! Link resolution and management service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::access_event::AccessEvent;
use crate::domain::entities::{Link, LinkStats, LinkUpdate, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::ResolutionCache;
use crate::utils::code_generator::{generate_code, validate_alias};
use crate::utils::url_normalizer::normalize_url;

/// Orchestrates the redirect read path and the link management write paths.
///
/// The resolver is invoked concurrently by many simultaneous redirect
/// requests and holds no lock of its own: the durable store and the cache
/// are the shared, externally-synchronized resources. Access recording is
/// pushed onto a bounded channel and applied off the request path by
/// [`crate::domain::access_worker::run_access_worker`].
pub struct LinkResolver<R: LinkRepository> {
    repository: Arc<R>,
    cache: Arc<dyn ResolutionCache>,
    access_tx: mpsc::Sender<AccessEvent>,
    code_length: usize,
}

impl<R: LinkRepository> LinkResolver<R> {
    /// Creates a new resolver.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn ResolutionCache>,
        access_tx: mpsc::Sender<AccessEvent>,
        code_length: usize,
    ) -> Self {
        Self {
            repository,
            cache,
            access_tx,
            code_length,
        }
    }

    /// Resolves a short code to its destination URL for a redirect.
    ///
    /// Cache hits are trusted as-is: writers evict expired and deleted
    /// entries proactively, so no re-validation happens on the hot path.
    /// On a miss the durable store is consulted and the cache refilled
    /// fire-and-forget. Either way a successful resolution queues an access
    /// event before returning.
    ///
    /// The embedding layer must answer with a temporary (307) redirect so
    /// that later updates and expiry stay effective.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for absent, inactive, and expired
    /// codes alike; callers cannot distinguish the cause.
    pub async fn resolve(
        &self,
        code: &str,
        client_ip: Option<String>,
    ) -> Result<String, AppError> {
        match self.cache.get_url(code).await {
            Ok(Some(url)) => {
                self.enqueue_access(code, client_ip);
                return Ok(url);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", code, e),
        }

        let link = self
            .repository
            .find_by_code(code)
            .await?
            .filter(Link::is_resolvable)
            .ok_or_else(|| Self::not_found(code))?;

        // Refill the cache off the request path.
        let cache = Arc::clone(&self.cache);
        let refill_code = link.short_code.clone();
        let refill_url = link.original_url.clone();
        let expires_at = link.expires_at;
        tokio::spawn(async move {
            if let Err(e) = cache.put_url(&refill_code, &refill_url, expires_at).await {
                error!("Failed to cache URL for {}: {}", refill_code, e);
            }
        });

        self.enqueue_access(code, client_ip);
        Ok(link.original_url)
    }

    /// Applies one access to the authoritative store and the cache counter.
    ///
    /// Called by the access worker, not by the redirect path. The store
    /// increment is atomic and in-place, so concurrent calls on the same
    /// code are each reflected. Returns `Ok(false)` if the link no longer
    /// exists.
    pub async fn record_access(&self, code: &str) -> Result<bool, AppError> {
        let found = self.repository.record_access(code).await?;

        if found {
            if let Err(e) = self.cache.bump_access_count(code).await {
                debug!("Cache counter bump failed for {}: {}", code, e);
            }
        }

        Ok(found)
    }

    /// Creates a new short link and populates the cache write-through.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] - malformed URL or custom alias
    /// - [`AppError::Conflict`] - custom alias already taken, whether caught
    ///   by the availability pre-check or by the store's unique constraint
    ///   at insert time
    pub async fn create(
        &self,
        original_url: &str,
        owner: Option<&str>,
        custom_alias: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        let normalized = normalize_url(original_url)
            .map_err(|e| AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() })))?;

        let link = match custom_alias {
            Some(alias) => {
                self.insert_with_alias(alias, normalized, owner, expires_at)
                    .await?
            }
            None => {
                self.insert_with_generated_code(normalized, owner, expires_at)
                    .await?
            }
        };

        if let Err(e) = self
            .cache
            .put_url(&link.short_code, &link.original_url, link.expires_at)
            .await
        {
            warn!("Failed to cache new link {}: {}", link.short_code, e);
        }

        Ok(link)
    }

    /// Fetches a link for management callers.
    ///
    /// Applies the same gating as resolution: inactive and expired links
    /// answer [`AppError::NotFound`].
    pub async fn lookup(&self, code: &str) -> Result<Link, AppError> {
        self.repository
            .find_by_code(code)
            .await?
            .filter(Link::is_resolvable)
            .ok_or_else(|| Self::not_found(code))
    }

    /// Updates a link's destination and/or expiry.
    ///
    /// The cache entry is invalidated and then repopulated, so a reader
    /// never sees the old destination once this returns.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] - no such code
    /// - [`AppError::Forbidden`] - caller does not match the owner rule
    /// - [`AppError::Validation`] - malformed replacement URL
    pub async fn update(
        &self,
        code: &str,
        caller: Option<&str>,
        new_url: Option<&str>,
        new_expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        let link = self
            .repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| Self::not_found(code))?;

        if !link.permits_mutation_by(caller) {
            return Err(AppError::forbidden(
                "Not authorized to update this link",
                json!({ "code": code }),
            ));
        }

        let original_url = new_url
            .map(|u| {
                normalize_url(u).map_err(|e| {
                    AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
                })
            })
            .transpose()?;

        let updated = self
            .repository
            .update(
                code,
                LinkUpdate {
                    original_url,
                    expires_at: new_expires_at,
                    is_active: None,
                },
            )
            .await?;

        if let Err(e) = self.cache.invalidate(code).await {
            warn!("Cache invalidation failed for {}: {}", code, e);
        }
        if let Err(e) = self
            .cache
            .put_url(code, &updated.original_url, updated.expires_at)
            .await
        {
            warn!("Failed to re-cache updated link {}: {}", code, e);
        }

        Ok(updated)
    }

    /// Deletes a link.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] - no such code
    /// - [`AppError::Forbidden`] - caller does not match the owner rule
    pub async fn delete(&self, code: &str, caller: Option<&str>) -> Result<(), AppError> {
        let link = self
            .repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| Self::not_found(code))?;

        if !link.permits_mutation_by(caller) {
            return Err(AppError::forbidden(
                "Not authorized to delete this link",
                json!({ "code": code }),
            ));
        }

        self.remove(&link).await
    }

    /// Shared removal path for deletes and cleanup sweeps.
    ///
    /// Cache invalidation runs synchronously with the store delete so no
    /// reader can pick up a stale URL afterwards.
    pub(crate) async fn remove(&self, link: &Link) -> Result<(), AppError> {
        self.repository.delete(&link.short_code).await?;

        if let Err(e) = self.cache.invalidate(&link.short_code).await {
            warn!("Cache invalidation failed for {}: {}", link.short_code, e);
        }

        Ok(())
    }

    /// Returns the statistics snapshot for a link, cache-first.
    ///
    /// A cached snapshot may lag the store by up to the snapshot TTL; it is
    /// dropped on every update or delete.
    pub async fn stats(&self, code: &str) -> Result<LinkStats, AppError> {
        match self.cache.get_stats(code).await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {}
            Err(e) => warn!("Cache stats lookup failed for {}: {}", code, e),
        }

        let link = self
            .repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| Self::not_found(code))?;

        let snapshot = LinkStats::from(&link);
        if let Err(e) = self.cache.put_stats(code, &snapshot).await {
            debug!("Failed to cache stats for {}: {}", code, e);
        }

        Ok(snapshot)
    }

    async fn insert_with_alias(
        &self,
        alias: &str,
        original_url: String,
        owner: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        if !validate_alias(alias) {
            return Err(AppError::bad_request(
                "Invalid custom alias format",
                json!({ "alias": alias }),
            ));
        }

        if self.repository.exists(alias).await? {
            return Err(Self::alias_taken(alias));
        }

        match self
            .repository
            .insert(self.new_link(alias.to_string(), original_url, owner, expires_at))
            .await
        {
            // The unique constraint closes the race between the availability
            // check and the insert.
            Err(AppError::Conflict { .. }) => Err(Self::alias_taken(alias)),
            result => result,
        }
    }

    async fn insert_with_generated_code(
        &self,
        original_url: String,
        owner: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        // Collisions are rare at 62^6 but grow with namespace fill; keep
        // drawing until a free code lands.
        loop {
            let code = generate_code(self.code_length);

            if self.repository.exists(&code).await? {
                debug!("Short code collision on {}, regenerating", code);
                continue;
            }

            match self
                .repository
                .insert(self.new_link(code, original_url.clone(), owner, expires_at))
                .await
            {
                Err(AppError::Conflict { .. }) => continue,
                result => return result,
            }
        }
    }

    fn new_link(
        &self,
        short_code: String,
        original_url: String,
        owner: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> NewLink {
        NewLink {
            id: Uuid::new_v4(),
            original_url,
            short_code,
            owner: owner.map(str::to_string),
            expires_at,
        }
    }

    fn enqueue_access(&self, code: &str, ip: Option<String>) {
        if let Err(e) = self.access_tx.try_send(AccessEvent::new(code, ip)) {
            // Never dropped silently: a saturated queue is an operational
            // signal.
            warn!("Access event for {} dropped: {}", code, e);
        }
    }

    /// Absent, inactive, and expired links all answer identically so callers
    /// cannot probe for a code's existence.
    fn not_found(code: &str) -> AppError {
        AppError::not_found("Short link not found", json!({ "code": code }))
    }

    fn alias_taken(alias: &str) -> AppError {
        AppError::conflict("Custom alias already in use", json!({ "alias": alias }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{MockResolutionCache, NullCache};
    use chrono::Duration;
    use mockall::Sequence;

    fn link_from(new_link: &NewLink) -> Link {
        Link {
            id: new_link.id,
            original_url: new_link.original_url.clone(),
            short_code: new_link.short_code.clone(),
            owner: new_link.owner.clone(),
            created_at: Utc::now(),
            expires_at: new_link.expires_at,
            last_accessed_at: None,
            access_count: 0,
            is_active: true,
        }
    }

    fn resolver_with(
        repo: MockLinkRepository,
        cache: Arc<dyn ResolutionCache>,
    ) -> (LinkResolver<MockLinkRepository>, mpsc::Receiver<AccessEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (LinkResolver::new(Arc::new(repo), cache, tx, 6), rx)
    }

    #[tokio::test]
    async fn test_create_generates_code_of_configured_length() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists().times(1).returning(|_| Ok(false));
        repo.expect_insert()
            .times(1)
            .returning(|new_link| Ok(link_from(&new_link)));

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let link = resolver
            .create("https://example.com", None, None, None)
            .await
            .unwrap();

        assert_eq!(link.short_code.len(), 6);
        assert!(link.short_code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_create_retries_on_code_collision() {
        let mut repo = MockLinkRepository::new();
        let mut seq = Sequence::new();
        repo.expect_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        repo.expect_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        repo.expect_insert()
            .times(1)
            .returning(|new_link| Ok(link_from(&new_link)));

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver.create("https://example.com", None, None, None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_retries_when_insert_loses_race() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists().times(2).returning(|_| Ok(false));
        let mut seq = Sequence::new();
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(AppError::conflict("Short code already in use", json!({})))
            });
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new_link| Ok(link_from(&new_link)));

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver.create("https://example.com", None, None, None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_url() {
        let repo = MockLinkRepository::new();
        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver.create("not-a-url", None, None, None).await;
        assert!(matches!(result.unwrap_err(), AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_alias() {
        let repo = MockLinkRepository::new();
        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver
            .create("https://example.com", None, Some("a!"), None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_create_alias_conflict_from_precheck() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists()
            .withf(|code| code == "mytest")
            .times(1)
            .returning(|_| Ok(true));
        repo.expect_insert().times(0);

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver
            .create("https://example.com", None, Some("mytest"), None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_alias_conflict_from_insert_race() {
        let mut repo = MockLinkRepository::new();
        repo.expect_exists().times(1).returning(|_| Ok(false));
        repo.expect_insert().times(1).returning(|_| {
            Err(AppError::conflict("Short code already in use", json!({})))
        });

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver
            .create("https://example.com", None, Some("mytest"), None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_resolve_cache_hit_skips_store() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(0);

        let mut cache = MockResolutionCache::new();
        cache
            .expect_get_url()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(Some("https://example.com/".to_string())));

        let (resolver, mut rx) = resolver_with(repo, Arc::new(cache));

        let url = resolver.resolve("abc123", None).await.unwrap();
        assert_eq!(url, "https://example.com/");

        // A hit still records the access.
        let event = rx.try_recv().unwrap();
        assert_eq!(event.short_code, "abc123");
    }

    #[tokio::test]
    async fn test_resolve_unknown_code_is_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| Ok(None));

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver.resolve("missing", None).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_inactive_link_is_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| {
            let mut link = link_from(&NewLink {
                id: Uuid::new_v4(),
                original_url: "https://example.com/".to_string(),
                short_code: "abc123".to_string(),
                owner: None,
                expires_at: None,
            });
            link.is_active = false;
            Ok(Some(link))
        });

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver.resolve("abc123", None).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_expired_link_is_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| {
            Ok(Some(link_from(&NewLink {
                id: Uuid::new_v4(),
                original_url: "https://example.com/".to_string(),
                short_code: "abc123".to_string(),
                owner: None,
                expires_at: Some(Utc::now() - Duration::days(1)),
            })))
        });

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver.resolve("abc123", None).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_by_wrong_caller_is_forbidden() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| {
            Ok(Some(link_from(&NewLink {
                id: Uuid::new_v4(),
                original_url: "https://example.com/".to_string(),
                short_code: "abc123".to_string(),
                owner: Some("alice".to_string()),
                expires_at: None,
            })))
        });
        repo.expect_update().times(0);

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver
            .update("abc123", Some("bob"), Some("https://other.com"), None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_update_invalidates_then_repopulates_cache() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| {
            Ok(Some(link_from(&NewLink {
                id: Uuid::new_v4(),
                original_url: "https://example.com/a".to_string(),
                short_code: "abc123".to_string(),
                owner: None,
                expires_at: None,
            })))
        });
        repo.expect_update().times(1).returning(|code, update| {
            Ok(link_from(&NewLink {
                id: Uuid::new_v4(),
                original_url: update.original_url.unwrap(),
                short_code: code.to_string(),
                owner: None,
                expires_at: None,
            }))
        });

        let mut cache = MockResolutionCache::new();
        let mut seq = Sequence::new();
        cache
            .expect_invalidate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        cache
            .expect_put_url()
            .withf(|_, url, _| url == "https://example.com/b")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let (resolver, _rx) = resolver_with(repo, Arc::new(cache));

        let updated = resolver
            .update("abc123", None, Some("https://example.com/b"), None)
            .await
            .unwrap();
        assert_eq!(updated.original_url, "https://example.com/b");
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache_synchronously() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| {
            Ok(Some(link_from(&NewLink {
                id: Uuid::new_v4(),
                original_url: "https://example.com/".to_string(),
                short_code: "abc123".to_string(),
                owner: None,
                expires_at: None,
            })))
        });
        repo.expect_delete().times(1).returning(|_| Ok(true));

        let mut cache = MockResolutionCache::new();
        cache
            .expect_invalidate()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(()));

        let (resolver, _rx) = resolver_with(repo, Arc::new(cache));

        resolver.delete("abc123", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_of_anonymous_link_by_authenticated_caller_is_forbidden() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| {
            Ok(Some(link_from(&NewLink {
                id: Uuid::new_v4(),
                original_url: "https://example.com/".to_string(),
                short_code: "abc123".to_string(),
                owner: None,
                expires_at: None,
            })))
        });
        repo.expect_delete().times(0);

        let (resolver, _rx) = resolver_with(repo, Arc::new(NullCache));

        let result = resolver.delete("abc123", Some("alice")).await;
        assert!(matches!(result.unwrap_err(), AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_record_access_bumps_cache_counter() {
        let mut repo = MockLinkRepository::new();
        repo.expect_record_access().times(1).returning(|_| Ok(true));

        let mut cache = MockResolutionCache::new();
        cache
            .expect_bump_access_count()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(()));

        let (resolver, _rx) = resolver_with(repo, Arc::new(cache));

        assert!(resolver.record_access("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_access_on_vanished_link_skips_counter() {
        let mut repo = MockLinkRepository::new();
        repo.expect_record_access().times(1).returning(|_| Ok(false));

        let mut cache = MockResolutionCache::new();
        cache.expect_bump_access_count().times(0);

        let (resolver, _rx) = resolver_with(repo, Arc::new(cache));

        assert!(!resolver.record_access("gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_prefers_cached_snapshot() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(0);

        let snapshot = LinkStats {
            short_code: "abc123".to_string(),
            original_url: "https://example.com/".to_string(),
            created_at: Utc::now(),
            access_count: 41,
            last_accessed_at: None,
        };
        let cached = snapshot.clone();

        let mut cache = MockResolutionCache::new();
        cache
            .expect_get_stats()
            .times(1)
            .returning(move |_| Ok(Some(cached.clone())));

        let (resolver, _rx) = resolver_with(repo, Arc::new(cache));

        let stats = resolver.stats("abc123").await.unwrap();
        assert_eq!(stats, snapshot);
    }
}

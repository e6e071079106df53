//! In-memory implementation of the link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;

use crate::domain::entities::{Link, LinkUpdate, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// In-memory link store keyed by short code.
///
/// DashMap's sharded locking gives per-key exclusive access, so concurrent
/// `record_access` calls on the same code are each reflected without a global
/// lock. Suitable for tests and single-process deployments; the data does not
/// survive a restart.
#[derive(Debug, Default)]
pub struct MemoryLinkRepository {
    links: DashMap<String, Link>,
}

impl MemoryLinkRepository {
    /// Creates an empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed link, bypassing store-assigned defaults.
    ///
    /// Lets tests and fixtures control `created_at`, `last_accessed_at`, and
    /// `is_active` directly. Existing entries for the same code are replaced.
    pub fn seed(&self, link: Link) {
        self.links.insert(link.short_code.clone(), link);
    }

    /// Number of stored links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if the store holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn insert(&self, new_link: NewLink) -> Result<Link, AppError> {
        let link = Link {
            id: new_link.id,
            original_url: new_link.original_url,
            short_code: new_link.short_code.clone(),
            owner: new_link.owner,
            created_at: Utc::now(),
            expires_at: new_link.expires_at,
            last_accessed_at: None,
            access_count: 0,
            is_active: true,
        };

        // Short codes stay occupied until the link is deleted or swept, even
        // once expired.
        match self.links.entry(new_link.short_code) {
            Entry::Occupied(occupied) => Err(AppError::conflict(
                "Short code already in use",
                json!({ "code": occupied.key() }),
            )),
            Entry::Vacant(vacant) => {
                vacant.insert(link.clone());
                Ok(link)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        Ok(self.links.get(code).map(|entry| entry.clone()))
    }

    async fn exists(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.links.contains_key(code))
    }

    async fn update(&self, code: &str, update: LinkUpdate) -> Result<Link, AppError> {
        match self.links.get_mut(code) {
            Some(mut entry) => {
                if let Some(url) = update.original_url {
                    entry.original_url = url;
                }
                if let Some(expires_at) = update.expires_at {
                    entry.expires_at = Some(expires_at);
                }
                if let Some(is_active) = update.is_active {
                    entry.is_active = is_active;
                }
                Ok(entry.clone())
            }
            None => Err(AppError::not_found(
                "Short link not found",
                json!({ "code": code }),
            )),
        }
    }

    async fn delete(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.links.remove(code).is_some())
    }

    async fn record_access(&self, code: &str) -> Result<bool, AppError> {
        match self.links.get_mut(code) {
            Some(mut entry) => {
                entry.access_count += 1;
                entry.last_accessed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        Ok(self
            .links
            .iter()
            .filter(|entry| entry.expires_at.is_some_and(|e| e < now))
            .map(|entry| entry.clone())
            .collect())
    }

    async fn find_unused(&self, cutoff: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        Ok(self
            .links
            .iter()
            .filter(|entry| match entry.last_accessed_at {
                Some(at) => at < cutoff,
                None => entry.created_at < cutoff,
            })
            .map(|entry| entry.clone())
            .collect())
    }
}

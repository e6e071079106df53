//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A shortened URL link with access metadata.
///
/// The `owner` field is an opaque token supplied by the authentication
/// collaborator; `None` marks an anonymous link.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: Uuid,
    pub original_url: String,
    pub short_code: String,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub access_count: i64,
    /// Soft-disable flag, independent of expiry.
    pub is_active: bool,
}

impl Link {
    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|e| Utc::now() > e)
    }

    /// Returns true if the link may answer a redirect: active and not expired.
    pub fn is_resolvable(&self) -> bool {
        self.is_active && !self.is_expired()
    }

    /// Authorization rule for update and delete.
    ///
    /// An owned link may only be touched by its owner; an anonymous link may
    /// only be touched by anonymous callers. Any mismatch is forbidden.
    pub fn permits_mutation_by(&self, caller: Option<&str>) -> bool {
        self.owner.as_deref() == caller
    }
}

/// Input data for creating a new link.
///
/// `created_at`, `access_count`, and `is_active` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub id: Uuid,
    pub original_url: String,
    pub short_code: String,
    pub owner: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update for an existing link. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct LinkUpdate {
    pub original_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

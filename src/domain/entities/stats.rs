//! Cacheable statistics snapshot for a link.

use crate::domain::entities::Link;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time view of a link's access statistics.
///
/// Serialized as JSON with a stable field layout so snapshots written by one
/// version of the service stay readable by the next. Snapshots are a derived,
/// disposable projection: they live in the cache with a short TTL and are
/// dropped on every update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStats {
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl From<&Link> for LinkStats {
    fn from(link: &Link) -> Self {
        Self {
            short_code: link.short_code.clone(),
            original_url: link.original_url.clone(),
            created_at: link.created_at,
            access_count: link.access_count,
            last_accessed_at: link.last_accessed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_schema_is_stable() {
        let stats = LinkStats {
            short_code: "abc123".to_string(),
            original_url: "https://example.com/".to_string(),
            created_at: Utc::now(),
            access_count: 7,
            last_accessed_at: None,
        };

        let json = serde_json::to_value(&stats).unwrap();
        for field in [
            "short_code",
            "original_url",
            "created_at",
            "access_count",
            "last_accessed_at",
        ] {
            assert!(json.get(field).is_some(), "missing field '{}'", field);
        }
        assert_eq!(json["access_count"], 7);
    }
}

//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{Link, LinkUpdate, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use serde_json::json;

const LINK_COLUMNS: &str = "id, original_url, short_code, owner_id, created_at, \
     expires_at, last_accessed_at, access_count, is_active";

/// Row shape of the `links` table.
#[derive(sqlx::FromRow)]
struct LinkRow {
    id: Uuid,
    original_url: String,
    short_code: String,
    owner_id: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    last_accessed_at: Option<DateTime<Utc>>,
    access_count: i64,
    is_active: bool,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link {
            id: row.id,
            original_url: row.original_url,
            short_code: row.short_code,
            owner: row.owner_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            last_accessed_at: row.last_accessed_at,
            access_count: row.access_count,
            is_active: row.is_active,
        }
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Uses bound parameters throughout for SQL injection protection. The
/// `links_short_code_key` unique constraint is the final arbiter of short
/// code uniqueness; violations surface as [`AppError::Conflict`].
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn insert(&self, new_link: NewLink) -> Result<Link, AppError> {
        let sql = format!(
            "INSERT INTO links (id, original_url, short_code, owner_id, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {LINK_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(new_link.id)
            .bind(&new_link.original_url)
            .bind(&new_link.short_code)
            .bind(&new_link.owner)
            .bind(new_link.expires_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row.into())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE short_code = $1");

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Link::from))
    }

    async fn exists(&self, code: &str) -> Result<bool, AppError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM links WHERE short_code = $1)",
        )
        .bind(code)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(taken)
    }

    async fn update(&self, code: &str, update: LinkUpdate) -> Result<Link, AppError> {
        let sql = format!(
            "UPDATE links SET \
                 original_url = COALESCE($2, original_url), \
                 expires_at = COALESCE($3, expires_at), \
                 is_active = COALESCE($4, is_active) \
             WHERE short_code = $1 \
             RETURNING {LINK_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(code)
            .bind(&update.original_url)
            .bind(update.expires_at)
            .bind(update.is_active)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Link::from)
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))
    }

    async fn delete(&self, code: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE short_code = $1")
            .bind(code)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_access(&self, code: &str) -> Result<bool, AppError> {
        // In-place increment: concurrent accesses serialize on the row and
        // are each reflected, never lost to a stale read-modify-write.
        let result = sqlx::query(
            "UPDATE links SET access_count = access_count + 1, last_accessed_at = NOW() \
             WHERE short_code = $1",
        )
        .bind(code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links \
             WHERE expires_at IS NOT NULL AND expires_at < $1"
        );

        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(now)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn find_unused(&self, cutoff: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links \
             WHERE (last_accessed_at IS NULL AND created_at < $1) \
                OR last_accessed_at < $1"
        );

        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(cutoff)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }
}

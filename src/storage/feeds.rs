use anyhow::Result;
use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::{Feed, FeedWithOwner};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Create a feed owned by a user. The URL is globally unique; creating a
    /// feed for an existing URL fails.
    pub async fn create_feed(&self, name: &str, url: &str, user_id: i64) -> Result<Feed> {
        let now = chrono::Utc::now().timestamp();
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, url, user_id, last_fetched_at, created_at
        "#,
        )
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Look up a feed by its URL
    pub async fn feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, last_fetched_at, created_at
            FROM feeds
            WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// List all feeds with their owners' names, for the `feeds` command
    pub async fn all_feeds_with_owners(&self) -> Result<Vec<FeedWithOwner>> {
        let feeds = sqlx::query_as::<_, FeedWithOwner>(
            r#"
            SELECT f.name, f.url, u.name AS owner
            FROM feeds f
            INNER JOIN users u ON f.user_id = u.id
            ORDER BY f.created_at, f.id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Select the next feed due for refresh: least recently fetched first,
    /// with never-fetched feeds (NULL) ahead of everything. `None` when no
    /// feeds exist, which the cycle treats as "nothing to do".
    pub async fn next_feed_due(&self) -> Result<Option<Feed>> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, last_fetched_at, created_at
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST
            LIMIT 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Stamp a feed's last-fetched time. Called exactly once per ingestion
    /// cycle for the selected feed, whether or not the fetch succeeded, so
    /// the feed moves to the back of the due ordering either way.
    pub async fn mark_feed_fetched(&self, feed_id: i64, fetched_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE feeds SET last_fetched_at = ? WHERE id = ?")
            .bind(fetched_at.timestamp())
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

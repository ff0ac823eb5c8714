use anyhow::Result;

use super::schema::Database;
use super::types::{NewPost, Post, PostInsert};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a post, deduplicated globally by URL.
    ///
    /// The conflict outcome is produced here as a tagged value rather than
    /// surfaced as an error: a post seen by an earlier cycle is expected, and
    /// re-ingestion must be idempotent.
    pub async fn insert_post(&self, post: &NewPost) -> Result<PostInsert> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
        "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(PostInsert::Inserted)
        } else {
            Ok(PostInsert::Duplicate)
        }
    }

    /// Latest posts across the feeds a user follows, newest first
    pub async fn posts_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description,
                   p.published_at, p.created_at
            FROM posts p
            INNER JOIN feed_follows ff ON p.feed_id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
